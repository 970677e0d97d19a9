//! Replica file operations
//!
//! Thin wrappers over the filesystem used by the sync driver to replay classified
//! changes. Every operation reports success as a flag and logs its own failure; none of
//! them return errors to the caller.

use crate::tree::path;
use crate::tree::WalkerConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};
use walkdir::WalkDir;

/// Copy / rename / remove primitives applied to the replica tree
pub trait ReplicaOps: Send {
    /// Copy a file or a whole directory tree, overwriting what is already there
    fn copy(&self, src: &Path, dst: &Path) -> bool;

    fn rename(&self, from: &Path, to: &Path) -> bool;

    /// Remove a file or a whole directory tree
    fn remove(&self, target: &Path) -> bool;
}

/// [`ReplicaOps`] backed by `std::fs`
///
/// When bound to a source root, tree copies follow the same symlink, ignore and depth
/// rules as the snapshot walk, so the replica never holds entries the baseline skips.
#[derive(Debug, Clone, Default)]
pub struct FsReplicaOps {
    source_root: Option<PathBuf>,
    walker: WalkerConfig,
}

impl FsReplicaOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy with the walk rules of `config`, matching paths relative to `source_root`
    pub fn for_source(source_root: PathBuf, config: WalkerConfig) -> Self {
        Self {
            source_root: Some(source_root),
            walker: config,
        }
    }

    /// Whether the snapshot walk would skip `entry`
    fn excluded(&self, entry: &Path) -> bool {
        let Some(root) = &self.source_root else {
            return false;
        };
        let Ok(rel) = path::relative_path(root, entry) else {
            return false;
        };
        let name = entry
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        self.walker.is_ignored(&name, &rel) || self.walker.exceeds_depth(&rel)
    }

    fn copy_tree(&self, src: &Path, dst: &Path) -> io::Result<()> {
        let walk = WalkDir::new(src)
            .follow_links(self.walker.follow_symlinks)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.excluded(entry.path()));
        for entry in walk {
            let entry = entry.map_err(|e| {
                e.into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"))
            })?;
            let rel = entry
                .path()
                .strip_prefix(src)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            let target = dst.join(rel);
            let file_type = entry.file_type();
            if file_type.is_dir() {
                fs::create_dir_all(&target)?;
            } else if file_type.is_file() {
                copy_file(entry.path(), &target)?;
            }
        }
        Ok(())
    }
}

impl ReplicaOps for FsReplicaOps {
    fn copy(&self, src: &Path, dst: &Path) -> bool {
        let result = match fs::metadata(src) {
            Ok(meta) if meta.is_dir() => self.copy_tree(src, dst),
            Ok(_) => copy_file(src, dst),
            Err(e) => Err(e),
        };
        report("copy", dst, result)
    }

    fn rename(&self, from: &Path, to: &Path) -> bool {
        let result = ensure_parent(to).and_then(|_| fs::rename(from, to));
        report("rename", to, result)
    }

    fn remove(&self, target: &Path) -> bool {
        let result = match fs::symlink_metadata(target) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(target),
            Ok(_) => fs::remove_file(target),
            Err(e) => Err(e),
        };
        report("remove", target, result)
    }
}

fn report(op: &str, target: &Path, result: io::Result<()>) -> bool {
    match result {
        Ok(()) => {
            trace!(op, target = %target.display(), "Replica operation succeeded");
            true
        }
        Err(e) => {
            warn!(op, target = %target.display(), error = %e, "Replica operation failed");
            false
        }
    }
}

fn ensure_parent(target: &Path) -> io::Result<()> {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn copy_file(src: &Path, dst: &Path) -> io::Result<()> {
    ensure_parent(dst)?;
    fs::copy(src, dst).map(|_| ())
}
