//! CLI route: single route table and run context. Dispatches to the sync engine and presentation.

use crate::classifier::Classifier;
use crate::cli::command_name;
use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::{
    format_changes_json, format_changes_text, format_cycle_report, format_snapshot_json,
    format_snapshot_text,
};
use crate::config::{ConfigLoader, SyncConfig};
use crate::error::SyncError;
use crate::store::SnapshotStore;
use crate::sync::{CancellationToken, SyncDriver, SyncWorker};
use crate::tree::SnapshotBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// CLI values layered over the loaded configuration for `run`
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub source: Option<PathBuf>,
    pub replica: Option<PathBuf>,
    pub period: Option<u64>,
}

impl RunOverrides {
    pub fn apply(&self, config: &mut SyncConfig) {
        if let Some(source) = &self.source {
            config.source = Some(source.clone());
        }
        if let Some(replica) = &self.replica {
            config.replica = Some(replica.clone());
        }
        if let Some(period) = self.period {
            config.period_secs = period;
        }
    }
}

/// Runtime context for CLI execution: the effective configuration and the stop signal
/// handed to the `run` worker.
pub struct RunContext {
    config: SyncConfig,
    token: CancellationToken,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, SyncError> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(&path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: SyncConfig) -> Self {
        Self {
            config,
            token: CancellationToken::new(),
        }
    }

    /// Use `token` to stop `run`; cancelling it lets the worker finish its checkpoint and exit
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, SyncError> {
        debug!(command = command_name(command), "Executing command");
        match command {
            Commands::Run {
                source,
                replica,
                period,
                cycles,
            } => {
                let overrides = RunOverrides {
                    source: source.clone(),
                    replica: replica.clone(),
                    period: *period,
                };
                self.run(&overrides, *cycles)
            }
            Commands::Scan { path, format } => self.scan(path, *format),
            Commands::Diff {
                source,
                replica,
                format,
            } => self.diff(source, replica, *format),
            Commands::Config => self.config.to_toml(),
        }
    }

    fn run(&self, overrides: &RunOverrides, cycles: Option<u64>) -> Result<String, SyncError> {
        let mut config = self.config.clone();
        overrides.apply(&mut config);
        let driver = SyncDriver::from_config(&config)?;
        info!(
            source = %driver.source().display(),
            replica = %driver.replica().display(),
            "Starting sync"
        );

        let mut worker = SyncWorker::spawn(driver, config.period(), cycles, self.token.clone())?;
        let Some(driver) = worker.join()? else {
            return Ok("Worker already stopped".to_string());
        };
        let mut out = format!("Completed {} cycle(s)", driver.cycles_run());
        if self.token.is_cancelled() {
            out.push_str(" (stopped on request)");
        }
        if let Some(report) = driver.last_report() {
            out.push('\n');
            out.push_str(&format_cycle_report(report));
        }
        Ok(out)
    }

    fn scan(&self, path: &Path, format: OutputFormat) -> Result<String, SyncError> {
        let snapshot = SnapshotBuilder::new(path.to_path_buf())
            .with_walker_config(self.config.walker.clone())
            .build()?;
        match format {
            OutputFormat::Text => Ok(format_snapshot_text(&snapshot, path)),
            OutputFormat::Json => format_snapshot_json(&snapshot),
        }
    }

    fn diff(&self, source: &Path, replica: &Path, format: OutputFormat) -> Result<String, SyncError> {
        let walker = self.config.walker.clone();
        let baseline = SnapshotBuilder::new(replica.to_path_buf())
            .with_walker_config(walker.clone())
            .build()?;
        let current = SnapshotBuilder::new(source.to_path_buf())
            .with_walker_config(walker)
            .build()?;

        let mut store = SnapshotStore::from_snapshot(baseline);
        let classification =
            Classifier::new(self.config.classifier.match_policy).classify(&mut store, &current);
        let records = classification.changes.into_vec();
        match format {
            OutputFormat::Text => Ok(format_changes_text(&records)),
            OutputFormat::Json => format_changes_json(&records),
        }
    }
}
