//! Entry point for loading configuration.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::SyncConfig;
use crate::error::SyncError;
use config::{File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Loads [`SyncConfig`] from layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace directory
    ///
    /// Precedence (lowest first): defaults, global file, `<workspace>/treesync.toml`,
    /// `TREESYNC_*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<SyncConfig, SyncError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let config: SyncConfig = builder.build()?.try_deserialize()?;
        debug!(
            workspace = %workspace_root.display(),
            period_secs = config.period_secs,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load configuration from one explicit file, ignoring the global and workspace files
    pub fn load_from_file(path: &Path) -> Result<SyncConfig, SyncError> {
        if !path.exists() {
            return Err(SyncError::Configuration(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).format(FileFormat::Toml));
        let builder = environment::add_to_builder(builder);
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Built-in defaults only
    pub fn defaults() -> SyncConfig {
        SyncConfig::default()
    }
}
