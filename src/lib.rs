//! Treesync: One-Way Directory Replication
//!
//! Periodically snapshots a source tree, classifies what changed since the previous
//! snapshot (additions, removals, renames and content changes of files and directories)
//! and replays those changes onto a replica directory.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod replica;
pub mod store;
pub mod sync;
pub mod tree;
pub mod types;

pub use classifier::{ChangeKind, ChangeRecord, ChangeSet, Classifier, MatchPolicy};
pub use error::SyncError;
pub use store::SnapshotStore;
pub use sync::{CancellationToken, CommitPolicy, CycleReport, DriverState, SyncDriver, SyncWorker};
pub use types::{DirectoryEntry, FileEntry, Fingerprint, Snapshot};
