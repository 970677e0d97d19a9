//! Shared test utilities for integration tests
//!
//! Source/replica fixtures on a temp dir, replica comparison, and serialized access to
//! XDG environment variables.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Global mutex to serialize XDG environment variable access across all tests
static XDG_ENV_MUTEX: Mutex<()> = Mutex::new(());

/// A source directory and a (not yet created) replica path inside one temp dir
pub struct SyncFixture {
    _temp: TempDir,
    pub source: PathBuf,
    pub replica: PathBuf,
}

impl SyncFixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let replica = temp.path().join("replica");
        fs::create_dir_all(&source).unwrap();
        Self {
            _temp: temp,
            source,
            replica,
        }
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.source.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn mkdir(&self, rel: &str) {
        fs::create_dir_all(self.source.join(rel)).unwrap();
    }

    pub fn rename(&self, from: &str, to: &str) {
        let target = self.source.join(to);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::rename(self.source.join(from), target).unwrap();
    }

    pub fn remove(&self, rel: &str) {
        let path = self.source.join(rel);
        if path.is_dir() {
            fs::remove_dir_all(path).unwrap();
        } else {
            fs::remove_file(path).unwrap();
        }
    }

    /// Assert the replica holds exactly the source's directories and file contents
    pub fn assert_replica_matches(&self) {
        assert_eq!(tree_contents(&self.replica), tree_contents(&self.source));
    }
}

/// Every entry under `root` keyed by relative path; directories map to `None`
pub fn tree_contents(root: &Path) -> BTreeMap<String, Option<String>> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| entry.unwrap())
        .map(|entry| {
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            let content = if entry.file_type().is_file() {
                Some(fs::read_to_string(entry.path()).unwrap())
            } else {
                None
            };
            (rel, content)
        })
        .collect()
}

/// Run `f` with XDG_CONFIG_HOME pointed at `test_dir`, restoring it afterwards
pub fn with_xdg_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let original = std::env::var("XDG_CONFIG_HOME").ok();

    std::env::set_var("XDG_CONFIG_HOME", test_dir.path());
    let result = f();

    match original {
        Some(orig) => std::env::set_var("XDG_CONFIG_HOME", orig),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }
    result
}
