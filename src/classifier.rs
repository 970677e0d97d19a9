//! Change classification
//!
//! Diffs the baseline held by a [`SnapshotStore`] against a freshly built [`Snapshot`]
//! and produces an ordered, de-duplicated list of [`ChangeRecord`]s. Identity is decided
//! purely by name and fingerprint correlation; no inode or platform identifier is used.
//!
//! Classification runs in two phases. The directory phase pairs vanished directories with
//! newly appeared ones sharing a listing fingerprint (relocations), evicts the unpaired
//! ones and classifies every current directory as matched, renamed or added. The file
//! phase runs for every matched directory and correlates file names and content hashes.
//! Removals are applied to the store as soon as they are classified.

use crate::store::SnapshotStore;
use crate::tree::path::join_relative;
use crate::types::{DirectoryEntry, FileEntry, Fingerprint, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use tracing::{debug, info};

/// Kind of a classified difference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    DirRemoved,
    DirRenamed,
    DirAdded,
    FileRemoved,
    FileRenamed,
    FileContentChanged,
    FileAdded,
}

impl ChangeKind {
    pub fn is_directory(&self) -> bool {
        matches!(
            self,
            ChangeKind::DirRemoved | ChangeKind::DirRenamed | ChangeKind::DirAdded
        )
    }

    pub fn is_removal(&self) -> bool {
        matches!(self, ChangeKind::DirRemoved | ChangeKind::FileRemoved)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::DirRemoved => "folder removed",
            ChangeKind::DirRenamed => "folder renamed",
            ChangeKind::DirAdded => "folder added",
            ChangeKind::FileRemoved => "file removed",
            ChangeKind::FileRenamed => "file renamed",
            ChangeKind::FileContentChanged => "content changed",
            ChangeKind::FileAdded => "file added",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One classified difference between the baseline and the current tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Snapshot-relative path of the directory or file
    pub subject: String,
    pub kind: ChangeKind,
    /// Previous path a rename was matched to, when that path no longer exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl ChangeRecord {
    pub fn new(subject: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            subject: subject.into(),
            kind,
            origin: None,
        }
    }

    pub fn renamed(subject: impl Into<String>, kind: ChangeKind, origin: Option<String>) -> Self {
        Self {
            subject: subject.into(),
            kind,
            origin,
        }
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Some(origin) => write!(f, "{}: {} (from {})", self.kind, self.subject, origin),
            None => write!(f, "{}: {}", self.kind, self.subject),
        }
    }
}

/// Ordered set of change records; inserting an equal record twice keeps one copy
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    records: Vec<ChangeRecord>,
    seen: HashSet<ChangeRecord>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record; returns false if an equal record is already present
    pub fn push(&mut self, record: ChangeRecord) -> bool {
        if self.seen.contains(&record) {
            return false;
        }
        info!(kind = %record.kind, subject = %record.subject, origin = ?record.origin, "Detected change");
        self.seen.insert(record.clone());
        self.records.push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn into_vec(self) -> Vec<ChangeRecord> {
        self.records
    }
}

/// How a current file is matched against the files previously stored for its directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Name and hash are looked up independently, possibly hitting different files
    #[default]
    Lenient,
    /// Unchanged only when a single previous file matches both name and hash
    Strict,
}

/// Result of one classification pass
#[derive(Debug, Default)]
pub struct Classification {
    pub changes: ChangeSet,
    /// Directory entries evicted from the store, keyed by path
    pub evicted_dirs: HashMap<String, DirectoryEntry>,
    /// File entries evicted from the store, keyed by the file's subject path
    pub evicted_files: HashMap<String, (String, FileEntry)>,
}

impl Classification {
    pub fn records(&self) -> &[ChangeRecord] {
        self.changes.records()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Two-phase change classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    policy: MatchPolicy,
}

impl Classifier {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Classify `current` against the baseline in `store`
    ///
    /// Removed directories and files are evicted from `store` immediately; additions and
    /// renames are left for the caller to commit once they have been replayed.
    pub fn classify(&self, store: &mut SnapshotStore, current: &Snapshot) -> Classification {
        let mut result = Classification::default();

        let current_paths: HashSet<&str> = current.iter().map(|d| d.path.as_str()).collect();

        // Current directories whose path is unknown to the baseline, by fingerprint
        let mut new_by_fingerprint: HashMap<Fingerprint, VecDeque<&str>> = HashMap::new();
        for dir in current.iter().filter(|d| !store.contains(&d.path)) {
            new_by_fingerprint
                .entry(dir.fingerprint)
                .or_default()
                .push_back(dir.path.as_str());
        }

        // Vanished directories: pair with a new path sharing the fingerprint, else evict
        let vanished: Vec<(String, Fingerprint)> = store
            .iter()
            .filter(|d| !current_paths.contains(d.path.as_str()))
            .map(|d| (d.path.clone(), d.fingerprint))
            .collect();

        let mut origins: HashMap<&str, String> = HashMap::new();
        for (path, fingerprint) in vanished {
            let partner = new_by_fingerprint
                .get_mut(&fingerprint)
                .and_then(|queue| queue.pop_front());
            match partner {
                Some(new_path) => {
                    debug!(from = %path, to = new_path, "Directory relocated");
                    origins.insert(new_path, path);
                }
                None => {
                    result
                        .changes
                        .push(ChangeRecord::new(path.clone(), ChangeKind::DirRemoved));
                    if let Some(entry) = store.remove_directory(&path) {
                        result.evicted_dirs.insert(path, entry);
                    }
                }
            }
        }

        for dir in current.iter() {
            if store.contains(&dir.path) {
                self.classify_files(store, &dir.path, dir, &mut result);
            } else if let Some(origin) = origins.get(dir.path.as_str()) {
                result.changes.push(ChangeRecord::renamed(
                    dir.path.clone(),
                    ChangeKind::DirRenamed,
                    Some(origin.clone()),
                ));
                // The relocated entry carries its files; compare them in place
                self.classify_files(store, origin, dir, &mut result);
            } else if store.find_by_fingerprint(&dir.fingerprint).next().is_some() {
                result.changes.push(ChangeRecord::renamed(
                    dir.path.clone(),
                    ChangeKind::DirRenamed,
                    None,
                ));
            } else {
                result
                    .changes
                    .push(ChangeRecord::new(dir.path.clone(), ChangeKind::DirAdded));
            }
        }

        result
    }

    /// File phase for one directory
    ///
    /// `stored_dir` names the baseline entry; `current.path` is used for record subjects.
    fn classify_files(
        &self,
        store: &mut SnapshotStore,
        stored_dir: &str,
        current: &DirectoryEntry,
        result: &mut Classification,
    ) {
        let Some(previous) = store.get(stored_dir).map(|d| d.files.clone()) else {
            return;
        };

        let current_names: HashSet<&str> = current.files.iter().map(|f| f.name.as_str()).collect();
        let current_hashes: HashSet<Fingerprint> =
            current.files.iter().map(|f| f.fingerprint).collect();

        for file in &previous {
            if !current_names.contains(file.name.as_str())
                && !current_hashes.contains(&file.fingerprint)
            {
                let subject = join_relative(&current.path, &file.name);
                result
                    .changes
                    .push(ChangeRecord::new(subject.clone(), ChangeKind::FileRemoved));
                if let Some(entry) = store.remove_file(stored_dir, &file.name) {
                    result
                        .evicted_files
                        .insert(subject, (stored_dir.to_string(), entry));
                }
            }
        }

        let previous = match store.get(stored_dir) {
            Some(d) => d.files.clone(),
            None => return,
        };
        let mut claimed_origins: HashSet<&str> = HashSet::new();

        for file in &current.files {
            let by_name = previous.iter().find(|p| p.name == file.name);
            let hash_known = previous.iter().any(|p| p.fingerprint == file.fingerprint);

            let unchanged = match self.policy {
                MatchPolicy::Lenient => by_name.is_some() && hash_known,
                MatchPolicy::Strict => by_name.is_some_and(|p| p.fingerprint == file.fingerprint),
            };
            if unchanged {
                continue;
            }

            let subject = join_relative(&current.path, &file.name);
            let record = if by_name.is_some() {
                ChangeRecord::new(subject, ChangeKind::FileContentChanged)
            } else if hash_known {
                let origin = previous
                    .iter()
                    .find(|p| {
                        p.fingerprint == file.fingerprint
                            && !current_names.contains(p.name.as_str())
                            && !claimed_origins.contains(p.name.as_str())
                    })
                    .map(|p| {
                        claimed_origins.insert(p.name.as_str());
                        join_relative(&current.path, &p.name)
                    });
                ChangeRecord::renamed(subject, ChangeKind::FileRenamed, origin)
            } else {
                ChangeRecord::new(subject, ChangeKind::FileAdded)
            };
            result.changes.push(record);
        }
    }
}
