//! Configuration System
//!
//! Layered configuration for a sync run: built-in defaults, the global config file, the
//! workspace `treesync.toml`, then `TREESYNC_*` environment variables. CLI flags are
//! applied on top by the caller.

use crate::classifier::MatchPolicy;
use crate::error::SyncError;
use crate::logging::LoggingConfig;
use crate::sync::CommitPolicy;
use crate::tree::path::canonicalize_path;
use crate::tree::WalkerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Directory to replicate from
    #[serde(default)]
    pub source: Option<PathBuf>,

    /// Directory kept in sync with the source
    #[serde(default)]
    pub replica: Option<PathBuf>,

    /// Seconds between scan cycles
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,

    /// Fully re-synchronize the replica on the first cycle
    #[serde(default = "default_true")]
    pub initial_mirror: bool,

    #[serde(default)]
    pub walker: WalkerConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Matching and commit behaviour of the change classifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub match_policy: MatchPolicy,
    #[serde(default)]
    pub commit_policy: CommitPolicy,
}

fn default_period_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source: None,
            replica: None,
            period_secs: default_period_secs(),
            initial_mirror: default_true(),
            walker: WalkerConfig::default(),
            classifier: ClassifierConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingSource,
    MissingReplica,
    SourceNotDirectory(PathBuf),
    Overlap(PathBuf, PathBuf),
    ZeroPeriod,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingSource => write!(f, "source path is not set"),
            ValidationError::MissingReplica => write!(f, "replica path is not set"),
            ValidationError::SourceNotDirectory(path) => {
                write!(f, "source {:?} is not an existing directory", path)
            }
            ValidationError::Overlap(source, replica) => write!(
                f,
                "source {:?} and replica {:?} must not be equal or nested",
                source, replica
            ),
            ValidationError::ZeroPeriod => write!(f, "period_secs must be greater than zero"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Canonical source and replica roots of a validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub source: PathBuf,
    pub replica: PathBuf,
}

impl SyncConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    /// Collect every validation problem
    pub fn validation_errors(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.period_secs == 0 {
            errors.push(ValidationError::ZeroPeriod);
        }

        let source = match &self.source {
            Some(source) if source.is_dir() => Some(source),
            Some(source) => {
                errors.push(ValidationError::SourceNotDirectory(source.clone()));
                None
            }
            None => {
                errors.push(ValidationError::MissingSource);
                None
            }
        };
        if self.replica.is_none() {
            errors.push(ValidationError::MissingReplica);
        }

        if let (Some(source), Some(replica)) = (source, &self.replica) {
            if let (Ok(source), Some(replica)) = (canonicalize_path(source), absolute(replica)) {
                if source.starts_with(&replica) || replica.starts_with(&source) {
                    errors.push(ValidationError::Overlap(source, replica));
                }
            }
        }

        errors
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), SyncError> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            return Ok(());
        }
        let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        Err(SyncError::Configuration(format!(
            "Configuration validation failed:\n{}",
            msgs.join("\n")
        )))
    }

    /// Validate and return canonical source and replica roots
    pub fn resolve_paths(&self) -> Result<ResolvedPaths, SyncError> {
        self.validate()?;
        let (Some(source), Some(replica)) = (&self.source, &self.replica) else {
            return Err(SyncError::Configuration(
                "source and replica must both be set".to_string(),
            ));
        };
        let replica = absolute(replica).ok_or_else(|| {
            SyncError::Configuration(format!("Cannot resolve replica path {:?}", replica))
        })?;
        Ok(ResolvedPaths {
            source: canonicalize_path(source)?,
            replica,
        })
    }

    /// Render as TOML, the same shape the config files use
    pub fn to_toml(&self) -> Result<String, SyncError> {
        toml::to_string_pretty(self)
            .map_err(|e| SyncError::Configuration(format!("Failed to render config: {}", e)))
    }
}

/// Absolute form of a path that may not exist yet
///
/// The deepest existing ancestor is canonicalized and the missing tail re-appended.
fn absolute(path: &Path) -> Option<PathBuf> {
    if let Ok(canonical) = dunce::canonicalize(path) {
        return Some(canonical);
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir().ok()?,
    };
    Some(absolute(&parent)?.join(path.file_name()?))
}
