//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::SyncError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &SyncError) -> String {
    match e {
        SyncError::Configuration(msg) => format!("Invalid configuration: {}", msg),
        other => other.to_string(),
    }
}
