//! CLI domain: parse, route, output, and presentation only.
//! No sync logic lives here; the route table dispatches to the driver, builder and classifier.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat};
pub use presentation::{
    format_changes_json, format_changes_text, format_cycle_report, format_snapshot_json,
    format_snapshot_text,
};
pub use route::{RunContext, RunOverrides};
