//! Error types for the treesync replication engine.

use crate::classifier::ChangeKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by snapshot building, classification, configuration and the sync worker
#[derive(Debug, Error)]
pub enum SyncError {
    /// The root or an entry beneath it vanished or became unreadable during a walk.
    /// The build is abandoned; no partial snapshot is produced.
    #[error("Walk failed at {path:?}: {source}")]
    WalkFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Replica operation for {kind} failed on {path:?}")]
    OperationFailure { kind: ChangeKind, path: PathBuf },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sync worker panicked")]
    WorkerPanicked,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Wrap an I/O error raised while walking `path`
    pub fn walk(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::WalkFailure {
            path: path.into(),
            source,
        }
    }
}

impl From<walkdir::Error> for SyncError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
        let source = err
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop"));
        SyncError::WalkFailure { path, source }
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::Configuration(err.to_string())
    }
}
