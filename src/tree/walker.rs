//! Filesystem walker for traversing directory structures

use crate::error::SyncError;
use crate::tree::path;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::trace;
use walkdir::{DirEntry, WalkDir};

/// One directory discovered by the walker, with its direct entries
#[derive(Debug, Clone)]
pub struct WalkedDirectory {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Path relative to the walk root (`"."` for the root)
    pub rel_path: String,
    /// Direct regular files as (normalized name, absolute path)
    pub files: Vec<(String, PathBuf)>,
    /// Names of every direct entry kept by the walk (files and sub-directories)
    pub entry_names: Vec<String>,
}

/// Filesystem walker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkerConfig {
    /// Whether to follow symbolic links (default: false; unfollowed links are skipped)
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Entry names, relative paths or `*.ext` suffixes to skip
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    /// Maximum depth to traverse (None = unlimited)
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            ignore_patterns: Vec::new(),
            max_depth: None,
        }
    }
}

impl WalkerConfig {
    /// Whether an entry with this name and root-relative path is skipped by the walk
    pub fn is_ignored(&self, name: &str, rel: &str) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| matches_pattern(pattern, name, rel))
    }

    /// Whether a root-relative path lies deeper than `max_depth`
    pub fn exceeds_depth(&self, rel: &str) -> bool {
        self.max_depth
            .is_some_and(|max| rel != "." && rel.split('/').count() > max)
    }
}

/// Filesystem walker
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given root path
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: WalkerConfig::default(),
        }
    }

    /// Create a walker with custom configuration
    pub fn with_config(root: PathBuf, config: WalkerConfig) -> Self {
        Self { root, config }
    }

    /// Walk the tree and collect every directory in pre-order
    ///
    /// Siblings are visited sorted by file name, so repeated walks of an unchanged tree
    /// return identical sequences. Any error (including the root vanishing) aborts the walk.
    pub fn walk(&self) -> Result<Vec<WalkedDirectory>, SyncError> {
        let root_meta = std::fs::metadata(&self.root).map_err(|e| SyncError::walk(&self.root, e))?;
        if !root_meta.is_dir() {
            return Err(SyncError::walk(
                &self.root,
                std::io::Error::new(std::io::ErrorKind::Other, "walk root is not a directory"),
            ));
        }

        let mut directories: Vec<WalkedDirectory> = Vec::new();
        let mut index: HashMap<PathBuf, usize> = HashMap::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX))
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.should_ignore(entry));

        for entry in walker {
            let entry = entry?;
            let file_type = entry.file_type();

            if !file_type.is_dir() && !file_type.is_file() {
                trace!(path = %entry.path().display(), "Skipping non-regular entry");
                continue;
            }

            let entry_path = entry.path().to_path_buf();
            let name = path::normalize_name(&entry.file_name().to_string_lossy());

            if entry.depth() > 0 {
                let parent = entry_path.parent().unwrap_or(&self.root);
                if let Some(&pos) = index.get(parent) {
                    let parent_dir = &mut directories[pos];
                    parent_dir.entry_names.push(name.clone());
                    if file_type.is_file() {
                        parent_dir.files.push((name, entry_path.clone()));
                    }
                }
            }

            if file_type.is_dir() {
                let rel_path = path::relative_path(&self.root, &entry_path)?;
                index.insert(entry_path.clone(), directories.len());
                directories.push(WalkedDirectory {
                    path: entry_path,
                    rel_path,
                    files: Vec::new(),
                    entry_names: Vec::new(),
                });
            }
        }

        Ok(directories)
    }

    /// Check if an entry should be ignored based on ignore patterns
    fn should_ignore(&self, entry: &DirEntry) -> bool {
        if self.config.ignore_patterns.is_empty() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        let rel = path::relative_path(&self.root, entry.path()).unwrap_or_default();
        self.config.is_ignored(&name, &rel)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn matches_pattern(pattern: &str, name: &str, rel: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix('*') {
        return !suffix.is_empty() && name.ends_with(suffix);
    }
    let pattern = pattern.trim_end_matches('/');
    name == pattern || rel == pattern
}
