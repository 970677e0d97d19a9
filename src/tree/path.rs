//! Path canonicalization and snapshot-relative path utilities
//!
//! Snapshot paths are relative to the scanned root, `/`-separated and NFC-normalized,
//! so a source tree and its replica produce directly comparable snapshots.

use crate::error::SyncError;
use crate::types::ROOT_PATH;
use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Canonicalize a root directory (resolves symlinks, `..`, `.`)
pub fn canonicalize_path(path: &Path) -> Result<PathBuf, SyncError> {
    dunce::canonicalize(path).map_err(|e| SyncError::walk(path, e))
}

/// Normalize a single entry name to NFC
pub fn normalize_name(name: &str) -> String {
    name.nfc().collect()
}

/// Express `path` relative to `root` in snapshot form
///
/// `root` itself maps to `"."`.
pub fn relative_path(root: &Path, path: &Path) -> Result<String, SyncError> {
    let rel = path.strip_prefix(root).map_err(|_| {
        SyncError::InvalidPath(format!("{:?} is not inside {:?}", path, root))
    })?;

    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(name) => parts.push(normalize_name(&name.to_string_lossy())),
            Component::CurDir => {}
            other => {
                return Err(SyncError::InvalidPath(format!(
                    "Unexpected component {:?} in {:?}",
                    other, path
                )))
            }
        }
    }

    if parts.is_empty() {
        Ok(ROOT_PATH.to_string())
    } else {
        Ok(parts.join("/"))
    }
}

/// Join a snapshot directory path and an entry name
pub fn join_relative(dir: &str, name: &str) -> String {
    if dir == ROOT_PATH || dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Split a snapshot path into its parent directory and final name
pub fn split_relative(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => (ROOT_PATH, path),
    }
}

/// Returns true if `path` equals `ancestor` or lies beneath it
pub fn is_within(ancestor: &str, path: &str) -> bool {
    if ancestor == ROOT_PATH {
        return true;
    }
    path == ancestor
        || (path.len() > ancestor.len()
            && path.starts_with(ancestor)
            && path.as_bytes()[ancestor.len()] == b'/')
}

/// Resolve a snapshot path against a filesystem root
pub fn to_fs_path(root: &Path, rel: &str) -> PathBuf {
    if rel == ROOT_PATH {
        return root.to_path_buf();
    }
    rel.split('/').fold(root.to_path_buf(), |acc, part| acc.join(part))
}
