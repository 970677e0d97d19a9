//! Fingerprint computation for files and directories using BLAKE3
//!
//! Files hash their byte content. Directories hash the sorted names of their direct
//! entries, never their own path and never their children's content, so a relocated
//! directory keeps its fingerprint and a content edit leaves the parent untouched.

use crate::error::SyncError;
use crate::tree::path;
use crate::types::Fingerprint;
use blake3::Hasher;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Compute the fingerprint of a path on disk
///
/// Regular files hash their content; directories hash their full listing.
pub fn fingerprint(target: &Path) -> Result<Fingerprint, SyncError> {
    let metadata = std::fs::metadata(target).map_err(|e| SyncError::walk(target, e))?;
    if metadata.is_dir() {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(target).map_err(|e| SyncError::walk(target, e))? {
            let entry = entry.map_err(|e| SyncError::walk(target, e))?;
            names.push(path::normalize_name(&entry.file_name().to_string_lossy()));
        }
        Ok(compute_directory_fingerprint(&names))
    } else {
        hash_file(target)
    }
}

/// Stream a file's bytes through BLAKE3
pub fn hash_file(file_path: &Path) -> Result<Fingerprint, SyncError> {
    let file = File::open(file_path).map_err(|e| SyncError::walk(file_path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Hasher::new();
    io::copy(&mut reader, &mut hasher).map_err(|e| SyncError::walk(file_path, e))?;
    Ok(hasher.finalize().into())
}

/// Compute content hash for in-memory bytes
pub fn compute_content_hash(content: &[u8]) -> Fingerprint {
    let mut hasher = Hasher::new();
    hasher.update(content);
    hasher.finalize().into()
}

/// Compute a directory fingerprint from its direct entry names
///
/// fingerprint = hash("directory" || count || (name_len || name)*), names sorted.
pub fn compute_directory_fingerprint<S: AsRef<str>>(names: &[S]) -> Fingerprint {
    let mut sorted: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
    sorted.sort_unstable();

    let mut hasher = Hasher::new();

    // Hash type discriminator
    hasher.update(b"directory");

    // Entry count (8 bytes, big-endian)
    hasher.update(&(sorted.len() as u64).to_be_bytes());

    for name in sorted {
        hasher.update(&(name.len() as u64).to_be_bytes());
        hasher.update(name.as_bytes());
    }

    hasher.finalize().into()
}
