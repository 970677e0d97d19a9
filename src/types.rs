//! Core snapshot types shared by the builder, classifier and store.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Path of the scanned root inside a snapshot
pub const ROOT_PATH: &str = ".";

/// BLAKE3 digest of a file's content or a directory's listing
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated hex form used in log lines and tables
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Fingerprint(bytes))
    }
}

impl From<blake3::Hash> for Fingerprint {
    fn from(hash: blake3::Hash) -> Self {
        Fingerprint(*hash.as_bytes())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Fingerprint::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// One regular file directly inside a directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub fingerprint: Fingerprint,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self {
            name: name.into(),
            fingerprint,
        }
    }
}

/// A directory and the files it directly contains
///
/// Sub-directories are separate entries of the snapshot, never nested here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Path relative to the scanned root, `/`-separated; the root is `"."`
    pub path: String,
    pub fingerprint: Fingerprint,
    pub files: Vec<FileEntry>,
}

impl DirectoryEntry {
    pub fn new(path: impl Into<String>, fingerprint: Fingerprint, files: Vec<FileEntry>) -> Self {
        Self {
            path: path.into(),
            fingerprint,
            files,
        }
    }

    pub fn file(&self, name: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn has_file_name(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.name == name)
    }

    pub fn has_file_fingerprint(&self, fingerprint: &Fingerprint) -> bool {
        self.files.iter().any(|f| &f.fingerprint == fingerprint)
    }
}

/// Directory entries of one tree in traversal order (parents before children)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub directories: Vec<DirectoryEntry>,
}

impl Snapshot {
    pub fn new(directories: Vec<DirectoryEntry>) -> Self {
        Self { directories }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.directories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&DirectoryEntry> {
        self.directories.iter().find(|d| d.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.directories.iter()
    }

    /// Total number of files across all directories
    pub fn file_count(&self) -> usize {
        self.directories.iter().map(|d| d.files.len()).sum()
    }

    /// Returns true when no two entries share a path
    pub fn has_unique_paths(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.directories.len());
        self.directories.iter().all(|d| seen.insert(d.path.as_str()))
    }
}

impl IntoIterator for Snapshot {
    type Item = DirectoryEntry;
    type IntoIter = std::vec::IntoIter<DirectoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.directories.into_iter()
    }
}
