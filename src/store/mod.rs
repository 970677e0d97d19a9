//! Snapshot Store
//!
//! Holds the baseline snapshot the next scan is diffed against. The classifier and the
//! sync driver mutate it in place while a cycle runs, so every step sees the removals
//! and insertions made before it.

use crate::types::{DirectoryEntry, FileEntry, Fingerprint, Snapshot};
use std::collections::HashMap;
use tracing::debug;

/// In-memory baseline, ordered like the snapshot it was seeded from
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    directories: Vec<DirectoryEntry>,
    by_path: HashMap<String, usize>,
    by_fingerprint: HashMap<Fingerprint, Vec<usize>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut store = Self::new();
        store.replace(snapshot);
        store
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.directories.len()
    }

    pub fn get(&self, path: &str) -> Option<&DirectoryEntry> {
        self.by_path.get(path).map(|&idx| &self.directories[idx])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    /// Directories whose listing fingerprint equals `fingerprint`, in store order
    pub fn find_by_fingerprint<'a>(
        &'a self,
        fingerprint: &'a Fingerprint,
    ) -> impl Iterator<Item = &'a DirectoryEntry> + 'a {
        self.by_fingerprint
            .get(fingerprint)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.directories[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.directories.iter()
    }

    /// Remove a directory entry together with its files
    pub fn remove_directory(&mut self, path: &str) -> Option<DirectoryEntry> {
        let idx = self.by_path.get(path).copied()?;
        let removed = self.directories.remove(idx);
        self.reindex();
        debug!(path = %removed.path, "Removed directory from baseline");
        Some(removed)
    }

    /// Remove one file entry from a directory
    pub fn remove_file(&mut self, dir: &str, name: &str) -> Option<FileEntry> {
        let idx = self.by_path.get(dir).copied()?;
        let files = &mut self.directories[idx].files;
        let pos = files.iter().position(|f| f.name == name)?;
        let removed = files.remove(pos);
        debug!(dir, file = %removed.name, "Removed file from baseline");
        Some(removed)
    }

    /// Insert a directory entry, replacing any entry already stored under its path
    pub fn insert_directory(&mut self, entry: DirectoryEntry) {
        match self.by_path.get(&entry.path).copied() {
            Some(idx) => {
                let old = self.directories[idx].fingerprint;
                self.unindex_fingerprint(old, idx);
                self.index_fingerprint(entry.fingerprint, idx);
                self.directories[idx] = entry;
            }
            None => {
                let idx = self.directories.len();
                self.by_path.insert(entry.path.clone(), idx);
                self.index_fingerprint(entry.fingerprint, idx);
                self.directories.push(entry);
            }
        }
    }

    /// Insert or replace a file entry in a stored directory
    ///
    /// Returns false if the directory is not in the store.
    pub fn upsert_file(&mut self, dir: &str, file: FileEntry) -> bool {
        let Some(&idx) = self.by_path.get(dir) else {
            return false;
        };
        let files = &mut self.directories[idx].files;
        match files.iter_mut().find(|f| f.name == file.name) {
            Some(existing) => *existing = file,
            None => files.push(file),
        }
        true
    }

    pub fn set_fingerprint(&mut self, dir: &str, fingerprint: Fingerprint) -> bool {
        let Some(&idx) = self.by_path.get(dir) else {
            return false;
        };
        let old = self.directories[idx].fingerprint;
        if old != fingerprint {
            self.unindex_fingerprint(old, idx);
            self.index_fingerprint(fingerprint, idx);
            self.directories[idx].fingerprint = fingerprint;
        }
        true
    }

    /// Move a stored entry to a new path, keeping its files and fingerprint
    ///
    /// Any entry already stored under `to` is dropped.
    pub fn relocate(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return self.contains(from);
        }
        let Some(mut entry) = self.remove_directory(from) else {
            return false;
        };
        self.remove_directory(to);
        entry.path = to.to_string();
        self.insert_directory(entry);
        true
    }

    /// Replace the whole baseline after a full re-synchronization
    pub fn replace(&mut self, snapshot: Snapshot) {
        self.directories = snapshot.directories;
        self.reindex();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.directories.clone())
    }

    pub fn into_snapshot(self) -> Snapshot {
        Snapshot::new(self.directories)
    }

    fn reindex(&mut self) {
        self.by_path.clear();
        self.by_fingerprint.clear();
        for (idx, dir) in self.directories.iter().enumerate() {
            self.by_path.insert(dir.path.clone(), idx);
            self.by_fingerprint.entry(dir.fingerprint).or_default().push(idx);
        }
    }

    // Positions stay sorted so lookups follow store order
    fn index_fingerprint(&mut self, fingerprint: Fingerprint, idx: usize) {
        let slots = self.by_fingerprint.entry(fingerprint).or_default();
        if let Err(pos) = slots.binary_search(&idx) {
            slots.insert(pos, idx);
        }
    }

    fn unindex_fingerprint(&mut self, fingerprint: Fingerprint, idx: usize) {
        if let Some(slots) = self.by_fingerprint.get_mut(&fingerprint) {
            slots.retain(|&i| i != idx);
            if slots.is_empty() {
                self.by_fingerprint.remove(&fingerprint);
            }
        }
    }
}
