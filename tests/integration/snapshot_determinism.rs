//! Integration tests for snapshot building determinism

use std::fs;
use tempfile::TempDir;
use treesync::tree::{SnapshotBuilder, WalkerConfig};
use treesync::SyncError;

/// Building the same unchanged tree twice yields identical snapshots
#[test]
fn test_unchanged_tree_same_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_path_buf();
    fs::write(root.join("file1.txt"), "content1").unwrap();
    fs::create_dir_all(root.join("dir1").join("inner")).unwrap();
    fs::write(root.join("dir1").join("file3.txt"), "content3").unwrap();

    let builder = SnapshotBuilder::new(root);
    let first = builder.build().unwrap();
    let second = builder.build().unwrap();

    assert_eq!(first, second);
    assert!(first.has_unique_paths());
    let paths: Vec<_> = first.iter().map(|d| d.path.as_str()).collect();
    assert_eq!(paths, vec![".", "dir1", "dir1/inner"]);
}

/// Two trees with the same layout and bytes at different locations compare equal
#[test]
fn test_snapshot_is_location_independent() {
    let temp_dir = TempDir::new().unwrap();
    for side in ["left", "right"] {
        let root = temp_dir.path().join(side);
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("docs").join("readme.md"), "# hi").unwrap();
    }

    let left = SnapshotBuilder::new(temp_dir.path().join("left")).build().unwrap();
    let right = SnapshotBuilder::new(temp_dir.path().join("right")).build().unwrap();
    assert_eq!(left, right);
}

/// A directory's fingerprint depends on its listing, not on child contents
#[test]
fn test_directory_fingerprint_ignores_child_content() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_path_buf();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("sub").join("f"), "one").unwrap();

    let builder = SnapshotBuilder::new(root.clone());
    let before = builder.build().unwrap();
    fs::write(root.join("sub").join("f"), "two").unwrap();
    let after = builder.build().unwrap();

    assert_eq!(
        before.get("sub").unwrap().fingerprint,
        after.get("sub").unwrap().fingerprint
    );
    assert_ne!(
        before.get("sub").unwrap().files[0].fingerprint,
        after.get("sub").unwrap().files[0].fingerprint
    );
}

#[test]
fn test_ignore_patterns_exclude_entries() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_path_buf();
    fs::write(root.join("keep.txt"), "k").unwrap();
    fs::write(root.join("scratch.tmp"), "t").unwrap();
    fs::create_dir(root.join(".git")).unwrap();

    let config = WalkerConfig {
        ignore_patterns: vec!["*.tmp".to_string(), ".git".to_string()],
        ..WalkerConfig::default()
    };
    let snapshot = SnapshotBuilder::new(root).with_walker_config(config).build().unwrap();

    assert_eq!(snapshot.len(), 1);
    let root_entry = snapshot.get(".").unwrap();
    assert!(root_entry.has_file_name("keep.txt"));
    assert!(!root_entry.has_file_name("scratch.tmp"));
}

#[test]
fn test_missing_root_is_walk_failure() {
    let temp_dir = TempDir::new().unwrap();
    let err = SnapshotBuilder::new(temp_dir.path().join("nope"))
        .build()
        .unwrap_err();
    assert!(matches!(err, SyncError::WalkFailure { .. }));
}
