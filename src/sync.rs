//! Sync Driver
//!
//! Runs scan → classify → apply cycles that replay source changes onto the replica,
//! and the background worker that repeats them on a fixed period until cancelled.

use crate::classifier::{ChangeKind, ChangeRecord, Classification, Classifier, MatchPolicy};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::replica::{FsReplicaOps, ReplicaOps};
use crate::store::SnapshotStore;
use crate::tree::path::{is_within, split_relative, to_fs_path};
use crate::tree::{SnapshotBuilder, WalkerConfig};
use crate::types::{DirectoryEntry, Snapshot};
use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// When a record's store mutation is committed relative to its replica operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Update the baseline as if every replica operation succeeded
    #[default]
    Optimistic,
    /// Update the baseline only after the replica operation succeeded; failed
    /// removals are restored so the next cycle retries them
    OnSuccess,
}

/// Lifecycle of the driver within and between cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriverState {
    Idle,
    Scanning,
    Classifying,
    Applying,
    Stopped,
}

/// Cooperative stop signal shared between the worker and its controller
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let _guard = self.inner.lock.lock();
        self.inner.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep for up to `timeout`, waking early on cancellation
    ///
    /// Returns true if the token was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.lock.lock();
        while !self.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            self.inner.wake.wait_for(&mut guard, deadline - now);
        }
        self.is_cancelled()
    }
}

/// Outcome of one cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub records: Vec<ChangeRecord>,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    /// True when this cycle installed a fresh baseline instead of diffing
    pub baseline_installed: bool,
    /// True when a stop request cut application short
    pub interrupted: bool,
}

enum Outcome {
    Applied,
    Skipped,
    Failed,
}

/// Orchestrates scan → classify → apply cycles for one source/replica pair
pub struct SyncDriver {
    source: PathBuf,
    replica: PathBuf,
    builder: SnapshotBuilder,
    classifier: Classifier,
    store: SnapshotStore,
    ops: Box<dyn ReplicaOps>,
    /// Set while `ops` is the built-in filesystem backend, which tracks the walker config
    fs_ops: bool,
    commit_policy: CommitPolicy,
    initial_mirror: bool,
    cycles: u64,
    last_report: Option<CycleReport>,
    state: Arc<RwLock<DriverState>>,
}

impl SyncDriver {
    /// Create a driver replaying onto the real filesystem with default options
    pub fn new(source: PathBuf, replica: PathBuf) -> Self {
        let ops = FsReplicaOps::for_source(source.clone(), WalkerConfig::default());
        let mut driver = Self::with_ops(source, replica, Box::new(ops));
        driver.fs_ops = true;
        driver
    }

    pub fn with_ops(source: PathBuf, replica: PathBuf, ops: Box<dyn ReplicaOps>) -> Self {
        Self {
            builder: SnapshotBuilder::new(source.clone()),
            source,
            replica,
            classifier: Classifier::default(),
            store: SnapshotStore::new(),
            ops,
            fs_ops: false,
            commit_policy: CommitPolicy::default(),
            initial_mirror: true,
            cycles: 0,
            last_report: None,
            state: Arc::new(RwLock::new(DriverState::Idle)),
        }
    }

    /// Build a driver from validated configuration
    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        let paths = config.resolve_paths()?;
        Ok(Self::new(paths.source, paths.replica)
            .with_walker_config(config.walker.clone())
            .with_match_policy(config.classifier.match_policy)
            .with_commit_policy(config.classifier.commit_policy)
            .with_initial_mirror(config.initial_mirror))
    }

    /// Walk rules for snapshots and, with the built-in backend, for replica copies
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        if self.fs_ops {
            self.ops = Box::new(FsReplicaOps::for_source(self.source.clone(), config.clone()));
        }
        self.builder = SnapshotBuilder::new(self.source.clone()).with_walker_config(config);
        self
    }

    pub fn with_match_policy(mut self, policy: MatchPolicy) -> Self {
        self.classifier = Classifier::new(policy);
        self
    }

    pub fn with_commit_policy(mut self, policy: CommitPolicy) -> Self {
        self.commit_policy = policy;
        self
    }

    pub fn with_initial_mirror(mut self, enabled: bool) -> Self {
        self.initial_mirror = enabled;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn replica(&self) -> &Path {
        &self.replica
    }

    /// Number of cycles started so far
    pub fn cycles_run(&self) -> u64 {
        self.cycles
    }

    pub fn last_report(&self) -> Option<&CycleReport> {
        self.last_report.as_ref()
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn state(&self) -> DriverState {
        *self.state.read()
    }

    /// Shared handle for observing the state from another thread
    pub fn state_handle(&self) -> Arc<RwLock<DriverState>> {
        Arc::clone(&self.state)
    }

    fn set_state(&self, state: DriverState) {
        *self.state.write() = state;
    }

    /// Run one full cycle
    ///
    /// The first cycle (empty baseline) installs the scanned snapshot and emits no
    /// records. A build failure aborts the cycle before the baseline is touched.
    #[instrument(skip(self, token), fields(source = %self.source.display(), cycle = self.cycles + 1))]
    pub fn run_cycle(&mut self, token: &CancellationToken) -> Result<CycleReport, SyncError> {
        self.cycles += 1;
        let started_at = Utc::now();
        let start = Instant::now();
        let mut report = CycleReport {
            cycle: self.cycles,
            started_at,
            duration_ms: 0,
            records: Vec::new(),
            applied: 0,
            skipped: 0,
            failed: 0,
            baseline_installed: false,
            interrupted: false,
        };

        self.set_state(DriverState::Scanning);
        let current = match self.builder.build() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.set_state(DriverState::Idle);
                return Err(e);
            }
        };

        if self.store.is_empty() {
            report.baseline_installed = self.install_baseline(current);
            report.duration_ms = start.elapsed().as_millis() as u64;
            self.last_report = Some(report.clone());
            self.set_state(DriverState::Idle);
            return Ok(report);
        }

        self.set_state(DriverState::Classifying);
        let classification = self.classifier.classify(&mut self.store, &current);

        self.set_state(DriverState::Applying);
        self.apply_all(&classification, &current, token, &mut report);
        self.refresh_fingerprints(&current);

        report.records = classification.changes.into_vec();
        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            records = report.records.len(),
            applied = report.applied,
            skipped = report.skipped,
            failed = report.failed,
            interrupted = report.interrupted,
            duration_ms = report.duration_ms,
            "Cycle completed"
        );
        self.last_report = Some(report.clone());
        if !report.interrupted {
            self.set_state(DriverState::Idle);
        }
        Ok(report)
    }

    /// Replace replica contents with a full copy of the source and reset the baseline
    pub fn full_resync(&mut self) -> Result<(), SyncError> {
        let snapshot = self.builder.build()?;
        self.store = SnapshotStore::new();
        if self.mirror() {
            self.store.replace(snapshot);
            Ok(())
        } else {
            Err(SyncError::OperationFailure {
                kind: ChangeKind::DirAdded,
                path: self.replica.clone(),
            })
        }
    }

    fn install_baseline(&mut self, snapshot: Snapshot) -> bool {
        if self.initial_mirror && !self.mirror() && self.commit_policy == CommitPolicy::OnSuccess {
            warn!("Initial mirror failed; baseline left empty so the next cycle retries");
            return false;
        }
        info!(directories = snapshot.len(), "Installed baseline snapshot");
        self.store.replace(snapshot);
        true
    }

    fn mirror(&self) -> bool {
        info!(replica = %self.replica.display(), "Mirroring source into replica");
        if self.replica.exists() && !self.ops.remove(&self.replica) {
            error!(replica = %self.replica.display(), "Failed to clear replica before mirroring");
            return false;
        }
        if !self.ops.copy(&self.source, &self.replica) {
            error!(replica = %self.replica.display(), "Failed to mirror source into replica");
            return false;
        }
        true
    }

    fn apply_all(
        &mut self,
        classification: &Classification,
        current: &Snapshot,
        token: &CancellationToken,
        report: &mut CycleReport,
    ) {
        let current_dirs: HashMap<&str, &DirectoryEntry> =
            current.iter().map(|d| (d.path.as_str(), d)).collect();
        let mut removed_roots: Vec<String> = Vec::new();
        let mut copied_roots: Vec<String> = Vec::new();
        let records = classification.records();

        for (idx, record) in records.iter().enumerate() {
            if token.is_cancelled() {
                warn!(remaining = records.len() - idx, "Stop requested; leaving remaining changes for the next run");
                for pending in &records[idx..] {
                    self.restore_eviction(pending, classification);
                }
                report.interrupted = true;
                self.set_state(DriverState::Stopped);
                return;
            }

            match self.apply(record, &mut removed_roots, &mut copied_roots) {
                Outcome::Applied => {
                    report.applied += 1;
                    self.commit(record, &current_dirs);
                }
                Outcome::Skipped => {
                    report.skipped += 1;
                    self.commit(record, &current_dirs);
                }
                Outcome::Failed => {
                    report.failed += 1;
                    let err = SyncError::OperationFailure {
                        kind: record.kind,
                        path: to_fs_path(&self.replica, &record.subject),
                    };
                    error!(error = %err, "Failed to apply change");
                    match self.commit_policy {
                        CommitPolicy::Optimistic => self.commit(record, &current_dirs),
                        CommitPolicy::OnSuccess => self.restore_eviction(record, classification),
                    }
                }
            }
        }
    }

    fn apply(
        &self,
        record: &ChangeRecord,
        removed_roots: &mut Vec<String>,
        copied_roots: &mut Vec<String>,
    ) -> Outcome {
        let target = to_fs_path(&self.replica, &record.subject);

        if record.kind.is_removal() {
            if removed_roots.iter().any(|r| is_within(r, &record.subject)) {
                debug!(subject = %record.subject, "Already removed with its parent");
                return Outcome::Skipped;
            }
            if record.kind == ChangeKind::DirRemoved {
                removed_roots.push(record.subject.clone());
            }
            return flag(self.ops.remove(&target));
        }

        let covered = copied_roots.iter().any(|r| is_within(r, &record.subject));

        if let (ChangeKind::DirRenamed | ChangeKind::FileRenamed, Some(origin)) =
            (record.kind, &record.origin)
        {
            let from = to_fs_path(&self.replica, origin);
            if covered {
                // The copied parent already brought the content; drop the stale original
                debug!(subject = %record.subject, origin = %origin, "Renamed entry arrived with a copied parent");
                return if from.exists() {
                    flag(self.ops.remove(&from))
                } else {
                    Outcome::Skipped
                };
            }
            if removed_roots.iter().any(|r| is_within(r, origin)) {
                // The origin went with a removed parent; fetch the content from the source
                debug!(subject = %record.subject, origin = %origin, "Origin removed with its parent");
                return self.copy_from_source(record, &target, copied_roots);
            }
            if !from.exists() && target.exists() {
                debug!(subject = %record.subject, origin = %origin, "Already relocated with its parent");
                return Outcome::Skipped;
            }
            return flag(self.ops.rename(&from, &target));
        }

        if covered {
            debug!(subject = %record.subject, "Already copied with its parent");
            return Outcome::Skipped;
        }
        self.copy_from_source(record, &target, copied_roots)
    }

    fn copy_from_source(
        &self,
        record: &ChangeRecord,
        target: &Path,
        copied_roots: &mut Vec<String>,
    ) -> Outcome {
        let source = to_fs_path(&self.source, &record.subject);
        let ok = self.ops.copy(&source, target);
        if ok && record.kind.is_directory() {
            copied_roots.push(record.subject.clone());
        }
        flag(ok)
    }

    /// Bring the baseline in line with an applied record
    fn commit(&mut self, record: &ChangeRecord, current: &HashMap<&str, &DirectoryEntry>) {
        match record.kind {
            // Evicted during classification
            ChangeKind::DirRemoved | ChangeKind::FileRemoved => {}
            ChangeKind::DirAdded | ChangeKind::DirRenamed => {
                let Some(entry) = current.get(record.subject.as_str()) else {
                    return;
                };
                match &record.origin {
                    Some(origin) if self.store.relocate(origin, &record.subject) => {
                        self.store.set_fingerprint(&record.subject, entry.fingerprint);
                    }
                    _ => self.store.insert_directory((*entry).clone()),
                }
            }
            ChangeKind::FileAdded | ChangeKind::FileContentChanged | ChangeKind::FileRenamed => {
                let (dir, name) = split_relative(&record.subject);
                let Some(file) = current.get(dir).and_then(|d| d.file(name)) else {
                    return;
                };
                if let Some(origin) = &record.origin {
                    let (origin_dir, origin_name) = split_relative(origin);
                    self.store.remove_file(origin_dir, origin_name);
                }
                self.store.upsert_file(dir, file.clone());
            }
        }
    }

    /// Put an evicted entry back so the next cycle classifies it again
    fn restore_eviction(&mut self, record: &ChangeRecord, classification: &Classification) {
        match record.kind {
            ChangeKind::DirRemoved => {
                if let Some(entry) = classification.evicted_dirs.get(&record.subject) {
                    self.store.insert_directory(entry.clone());
                }
            }
            ChangeKind::FileRemoved => {
                if let Some((stored_dir, entry)) = classification.evicted_files.get(&record.subject) {
                    let (dir, _) = split_relative(&record.subject);
                    if !self.store.upsert_file(dir, entry.clone()) {
                        self.store.upsert_file(stored_dir, entry.clone());
                    }
                }
            }
            _ => {}
        }
    }

    /// Matched directories adopt their current listing fingerprint
    fn refresh_fingerprints(&mut self, current: &Snapshot) {
        for dir in current.iter() {
            self.store.set_fingerprint(&dir.path, dir.fingerprint);
        }
    }
}

fn flag(ok: bool) -> Outcome {
    if ok {
        Outcome::Applied
    } else {
        Outcome::Failed
    }
}

/// Background thread repeating cycles until stopped
pub struct SyncWorker {
    token: CancellationToken,
    state: Arc<RwLock<DriverState>>,
    handle: Option<JoinHandle<SyncDriver>>,
}

impl SyncWorker {
    /// Start the worker; `max_cycles = None` runs until the token is cancelled
    pub fn spawn(
        driver: SyncDriver,
        period: Duration,
        max_cycles: Option<u64>,
        token: CancellationToken,
    ) -> Result<Self, SyncError> {
        let state = driver.state_handle();
        let worker_token = token.clone();
        let handle = std::thread::Builder::new()
            .name("treesync-worker".to_string())
            .spawn(move || run_loop(driver, period, max_cycles, worker_token))?;

        Ok(Self {
            token,
            state,
            handle: Some(handle),
        })
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn state(&self) -> DriverState {
        *self.state.read()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Request a stop and wait for the worker; safe to call more than once
    pub fn stop(&mut self) -> Result<Option<SyncDriver>, SyncError> {
        self.token.cancel();
        self.join()
    }

    /// Wait for the worker to exit and hand back its driver
    ///
    /// Returns `Ok(None)` if the worker was already joined.
    pub fn join(&mut self) -> Result<Option<SyncDriver>, SyncError> {
        match self.handle.take() {
            Some(handle) => handle.join().map(Some).map_err(|_| {
                error!("Sync worker panicked");
                SyncError::WorkerPanicked
            }),
            None => Ok(None),
        }
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.stop();
        }
    }
}

fn run_loop(
    mut driver: SyncDriver,
    period: Duration,
    max_cycles: Option<u64>,
    token: CancellationToken,
) -> SyncDriver {
    info!(
        source = %driver.source().display(),
        replica = %driver.replica().display(),
        period_secs = period.as_secs(),
        "Sync worker started"
    );
    let mut completed = 0u64;
    loop {
        if token.is_cancelled() {
            break;
        }
        if let Err(e) = driver.run_cycle(&token) {
            error!(error = %e, "Synchronization cycle failed; retrying next period");
        }
        completed += 1;
        if max_cycles.is_some_and(|max| completed >= max) {
            break;
        }
        if token.wait_timeout(period) {
            break;
        }
    }
    driver.set_state(DriverState::Stopped);
    info!(cycles = completed, "Sync worker stopped");
    driver
}
