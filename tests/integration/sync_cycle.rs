//! End-to-end cycles replaying source changes onto a real replica

use super::test_utils::{tree_contents, SyncFixture};
use treesync::tree::WalkerConfig;
use treesync::{CancellationToken, ChangeKind, CommitPolicy, SyncDriver};

fn driver(fx: &SyncFixture) -> SyncDriver {
    SyncDriver::new(fx.source.clone(), fx.replica.clone())
}

#[test]
fn test_first_cycle_empty_then_single_dir_rename() {
    let fx = SyncFixture::new();
    fx.write("f1.txt", "hello");
    fx.write("sub/f2.txt", "inner");
    let token = CancellationToken::new();
    let mut driver = driver(&fx);

    let first = driver.run_cycle(&token).unwrap();
    assert!(first.records.is_empty());
    assert!(first.baseline_installed);
    fx.assert_replica_matches();

    fx.rename("sub", "sub2");
    let second = driver.run_cycle(&token).unwrap();

    assert_eq!(second.records.len(), 1);
    assert_eq!(second.records[0].kind, ChangeKind::DirRenamed);
    assert_eq!(second.records[0].subject, "sub2");
    assert_eq!(second.failed, 0);
    fx.assert_replica_matches();

    let third = driver.run_cycle(&token).unwrap();
    assert!(third.records.is_empty());
}

#[test]
fn test_mixed_changes_converge() {
    let fx = SyncFixture::new();
    fx.write("keep.txt", "keep");
    fx.write("edit.txt", "v1");
    fx.write("old-name.txt", "same bytes");
    fx.write("gone/x.txt", "x");
    fx.write("gone/nested/y.txt", "y");
    fx.mkdir("empty");
    let token = CancellationToken::new();
    let mut driver = driver(&fx);
    driver.run_cycle(&token).unwrap();

    fx.write("edit.txt", "v2");
    fx.rename("old-name.txt", "new-name.txt");
    fx.remove("gone");
    fx.remove("empty");
    fx.write("fresh/deep/z.txt", "z");

    let report = driver.run_cycle(&token).unwrap();
    assert_eq!(report.failed, 0);
    fx.assert_replica_matches();
    assert!(driver.run_cycle(&token).unwrap().records.is_empty());
}

#[test]
fn test_move_into_new_directory_leaves_no_stale_copy() {
    let fx = SyncFixture::new();
    fx.write("a/b/file.txt", "content");
    let token = CancellationToken::new();
    let mut driver = driver(&fx);
    driver.run_cycle(&token).unwrap();

    fx.rename("a/b", "new/b");
    let report = driver.run_cycle(&token).unwrap();

    assert_eq!(report.failed, 0);
    fx.assert_replica_matches();
}

#[test]
fn test_rename_then_edit_in_same_cycle() {
    let fx = SyncFixture::new();
    fx.write("docs/a.txt", "a");
    fx.write("docs/b.txt", "b");
    let token = CancellationToken::new();
    let mut driver = driver(&fx);
    driver.run_cycle(&token).unwrap();

    fx.rename("docs", "manual");
    fx.write("manual/a.txt", "a2");
    driver.run_cycle(&token).unwrap();

    fx.assert_replica_matches();
}

#[test]
fn test_replica_drift_is_retried_with_on_success_commit() {
    let fx = SyncFixture::new();
    fx.write("a.txt", "a");
    let token = CancellationToken::new();
    let mut driver = driver(&fx).with_commit_policy(CommitPolicy::OnSuccess);
    driver.run_cycle(&token).unwrap();

    // Block the copy by occupying the target path with a directory
    std::fs::create_dir_all(fx.replica.join("b.txt").join("blocker")).unwrap();
    fx.write("b.txt", "b");
    let report = driver.run_cycle(&token).unwrap();
    assert_eq!(report.failed, 1);

    std::fs::remove_dir_all(fx.replica.join("b.txt")).unwrap();
    let retry = driver.run_cycle(&token).unwrap();
    assert_eq!(retry.records.len(), 1);
    assert_eq!(retry.applied, 1);
    fx.assert_replica_matches();
}

#[test]
fn test_initial_mirror_replaces_existing_replica() {
    let fx = SyncFixture::new();
    fx.write("src.txt", "s");
    std::fs::create_dir_all(&fx.replica).unwrap();
    std::fs::write(fx.replica.join("stale.txt"), "old").unwrap();

    driver(&fx).run_cycle(&CancellationToken::new()).unwrap();

    let contents = tree_contents(&fx.replica);
    assert!(!contents.contains_key("stale.txt"));
    assert_eq!(contents.get("src.txt"), Some(&Some("s".to_string())));
}

#[test]
fn test_move_out_of_removed_parent_keeps_content() {
    for policy in [CommitPolicy::Optimistic, CommitPolicy::OnSuccess] {
        let fx = SyncFixture::new();
        fx.write("p/q/f.txt", "payload");
        let token = CancellationToken::new();
        let mut driver = driver(&fx).with_commit_policy(policy);
        driver.run_cycle(&token).unwrap();

        fx.rename("p/q", "q");
        fx.remove("p");
        let report = driver.run_cycle(&token).unwrap();

        let kinds: Vec<_> = report.records.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, [ChangeKind::DirRemoved, ChangeKind::DirRenamed]);
        assert_eq!(report.records[1].origin.as_deref(), Some("p/q"));
        assert_eq!(report.failed, 0);
        fx.assert_replica_matches();

        assert!(driver.run_cycle(&token).unwrap().records.is_empty());
        fx.assert_replica_matches();
    }
}

#[cfg(unix)]
#[test]
fn test_followed_symlink_reaches_replica() {
    let fx = SyncFixture::new();
    let outside = fx.source.parent().unwrap().join("outside.txt");
    std::fs::write(&outside, "linked").unwrap();
    std::os::unix::fs::symlink(&outside, fx.source.join("link.txt")).unwrap();
    fx.write("plain.txt", "plain");

    let config = WalkerConfig {
        follow_symlinks: true,
        ..WalkerConfig::default()
    };
    let mut driver = driver(&fx).with_walker_config(config);
    driver.run_cycle(&CancellationToken::new()).unwrap();

    assert!(driver.store().get(".").unwrap().has_file_name("link.txt"));
    let contents = tree_contents(&fx.replica);
    assert_eq!(contents.get("link.txt"), Some(&Some("linked".to_string())));
    assert_eq!(contents.get("plain.txt"), Some(&Some("plain".to_string())));
}

#[test]
fn test_ignored_entries_stay_out_of_replica() {
    let fx = SyncFixture::new();
    fx.write("keep.txt", "keep");
    fx.write("cache/blob.bin", "blob");
    fx.write("notes.tmp", "tmp");

    let config = WalkerConfig {
        ignore_patterns: vec!["cache".to_string(), "*.tmp".to_string()],
        ..WalkerConfig::default()
    };
    let token = CancellationToken::new();
    let mut driver = driver(&fx).with_walker_config(config);
    driver.run_cycle(&token).unwrap();

    fx.write("new/inner.tmp", "tmp");
    fx.write("new/data.txt", "data");
    driver.run_cycle(&token).unwrap();

    let contents = tree_contents(&fx.replica);
    let paths: Vec<_> = contents.keys().map(String::as_str).collect();
    assert_eq!(paths, ["keep.txt", "new", "new/data.txt"]);
}
