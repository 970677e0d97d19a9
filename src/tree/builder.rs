//! Snapshot builder for capturing a directory tree

use crate::error::SyncError;
use crate::tree::hasher;
use crate::tree::walker::{Walker, WalkerConfig};
use crate::types::{DirectoryEntry, FileEntry, Snapshot};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, instrument, trace};

/// Snapshot builder for a single root directory
pub struct SnapshotBuilder {
    root: PathBuf,
    walker_config: Option<WalkerConfig>,
}

impl SnapshotBuilder {
    /// Create a new snapshot builder for the given root path
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            walker_config: None,
        }
    }

    /// Set walker config (ignore patterns, symlink policy, depth).
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = Some(config);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build a snapshot of the tree
    ///
    /// Every directory (including the root) yields one entry carrying its listing
    /// fingerprint and the fingerprints of its direct files. Any failure aborts the
    /// whole build.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn build(&self) -> Result<Snapshot, SyncError> {
        let start = Instant::now();
        debug!("Starting snapshot build");

        let walker = match &self.walker_config {
            Some(config) => Walker::with_config(self.root.clone(), config.clone()),
            None => Walker::new(self.root.clone()),
        };
        let walked = match walker.walk() {
            Ok(w) => w,
            Err(e) => {
                error!("Filesystem walk failed: {}", e);
                return Err(e);
            }
        };

        let mut directories = Vec::with_capacity(walked.len());
        for dir in walked {
            let mut files = Vec::with_capacity(dir.files.len());
            for (name, file_path) in &dir.files {
                let fingerprint = hasher::hash_file(file_path)?;
                trace!(file = %file_path.display(), fingerprint = %fingerprint.short(), "Found file");
                files.push(FileEntry::new(name.clone(), fingerprint));
            }

            let fingerprint = hasher::compute_directory_fingerprint(&dir.entry_names);
            directories.push(DirectoryEntry::new(dir.rel_path, fingerprint, files));
        }

        let snapshot = Snapshot::new(directories);
        info!(
            directories = snapshot.len(),
            files = snapshot.file_count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Snapshot build completed"
        );

        Ok(snapshot)
    }
}
