//! CLI parse: clap types for treesync. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Treesync CLI - one-way directory replication
#[derive(Parser, Debug)]
#[command(name = "treesync")]
#[command(about = "Keep a replica directory in sync with a source directory")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace directory searched for treesync.toml
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the periodic sync worker
    Run {
        /// Source directory (overrides config)
        #[arg(long)]
        source: Option<PathBuf>,
        /// Replica directory (overrides config)
        #[arg(long)]
        replica: Option<PathBuf>,
        /// Seconds between cycles (overrides config)
        #[arg(long)]
        period: Option<u64>,
        /// Stop after this many cycles (default: run until killed)
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// Build and print a snapshot of a directory
    Scan {
        path: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Classify a source against a replica without touching either
    Diff {
        source: PathBuf,
        replica: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
