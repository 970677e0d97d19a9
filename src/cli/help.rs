//! CLI command-name contract used in log fields.

use crate::cli::parse::Commands;

/// Command name string for logging (e.g. "run", "scan").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Run { .. } => "run",
        Commands::Scan { .. } => "scan",
        Commands::Diff { .. } => "diff",
        Commands::Config => "config",
    }
}
