//! Treesync CLI Binary
//!
//! Command-line interface for the treesync replication engine.

use anyhow::Context;
use clap::Parser;
use std::process;
use tracing::{error, info};
use treesync::cli::{Cli, Commands, RunContext};
use treesync::config::ConfigLoader;
use treesync::logging::{init_logging, LoggingConfig};
use treesync::CancellationToken;

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!(command = treesync::cli::command_name(&cli.command), "Treesync CLI starting");

    match run(&cli) {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    let token = CancellationToken::new();
    if matches!(cli.command, Commands::Run { .. }) {
        install_interrupt_handler(&token)?;
    }
    let context = RunContext::new(cli.workspace.clone(), cli.config.clone())
        .map_err(|e| anyhow::anyhow!(treesync::cli::map_error(&e)))
        .context("Failed to load configuration")?
        .with_cancellation(token);
    context
        .execute(&cli.command)
        .map_err(|e| anyhow::anyhow!(treesync::cli::map_error(&e)))
}

/// Ctrl-C cancels the worker instead of killing the process, so the current change
/// finishes and pending removals are restored before exit
fn install_interrupt_handler(token: &CancellationToken) -> anyhow::Result<()> {
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        info!("Interrupt received, stopping sync worker");
        handler_token.cancel();
    })
    .context("Failed to install Ctrl-C handler")
}

/// Build logging configuration from CLI args and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path).map(|c| c.logging),
        None => ConfigLoader::load(&cli.workspace).map(|c| c.logging),
    }
    .unwrap_or_default();

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }

    config
}
