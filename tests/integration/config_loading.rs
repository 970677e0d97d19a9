//! Layered configuration feeding a driver

use super::test_utils::{with_xdg_env, SyncFixture};
use std::fs;
use tempfile::TempDir;
use treesync::config::{ConfigLoader, SyncConfig};
use treesync::{CancellationToken, CommitPolicy, MatchPolicy, SyncDriver, SyncError};

#[test]
fn test_global_config_is_loaded_from_xdg_home() {
    let xdg = TempDir::new().unwrap();
    fs::create_dir_all(xdg.path().join("treesync")).unwrap();
    fs::write(
        xdg.path().join("treesync").join("config.toml"),
        "period_secs = 45\n\n[classifier]\nmatch_policy = \"strict\"\n",
    )
    .unwrap();
    let workspace = TempDir::new().unwrap();

    let config = with_xdg_env(&xdg, || ConfigLoader::load(workspace.path())).unwrap();
    assert_eq!(config.period_secs, 45);
    assert_eq!(config.classifier.match_policy, MatchPolicy::Strict);
    assert_eq!(config.classifier.commit_policy, CommitPolicy::Optimistic);
}

#[test]
fn test_driver_from_workspace_config_applies_walker_settings() {
    let fx = SyncFixture::new();
    fx.write("keep.txt", "k");
    fx.write("skip.tmp", "t");

    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join("treesync.toml"),
        format!(
            "source = {:?}\nreplica = {:?}\n\n[walker]\nignore_patterns = [\"*.tmp\"]\n",
            fx.source.to_string_lossy(),
            fx.replica.to_string_lossy()
        ),
    )
    .unwrap();

    let xdg = TempDir::new().unwrap();
    let config = with_xdg_env(&xdg, || ConfigLoader::load(workspace.path())).unwrap();
    let mut driver = SyncDriver::from_config(&config).unwrap();
    driver.run_cycle(&CancellationToken::new()).unwrap();

    assert!(!driver.store().get(".").unwrap().has_file_name("skip.tmp"));
    assert!(driver.store().get(".").unwrap().has_file_name("keep.txt"));
}

#[test]
fn test_nested_replica_rejected_at_startup() {
    let fx = SyncFixture::new();
    let config = SyncConfig {
        source: Some(fx.source.clone()),
        replica: Some(fx.source.join("backup")),
        ..SyncConfig::default()
    };

    match SyncDriver::from_config(&config) {
        Err(SyncError::Configuration(msg)) => assert!(msg.contains("nested")),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("nested replica accepted"),
    }
}

#[test]
fn test_missing_explicit_config_file_is_error() {
    let temp = TempDir::new().unwrap();
    let err = ConfigLoader::load_from_file(&temp.path().join("none.toml")).unwrap_err();
    assert!(matches!(err, SyncError::Configuration(_)));
}
