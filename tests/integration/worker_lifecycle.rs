//! Background worker start/stop behaviour

use super::test_utils::SyncFixture;
use std::time::{Duration, Instant};
use treesync::{CancellationToken, DriverState, SyncDriver, SyncWorker};

#[test]
fn test_worker_replays_changes_between_cycles() {
    let fx = SyncFixture::new();
    fx.write("a.txt", "a");
    let driver = SyncDriver::new(fx.source.clone(), fx.replica.clone());
    let mut worker = SyncWorker::spawn(
        driver,
        Duration::from_millis(20),
        None,
        CancellationToken::new(),
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while !fx.replica.join("a.txt").exists() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    fx.write("b.txt", "b");
    while !fx.replica.join("b.txt").exists() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }

    let driver = worker.stop().unwrap().unwrap();
    assert_eq!(driver.state(), DriverState::Stopped);
    assert!(driver.cycles_run() >= 2);
    fx.assert_replica_matches();
}

#[test]
fn test_stop_interrupts_long_sleep() {
    let fx = SyncFixture::new();
    let driver = SyncDriver::new(fx.source.clone(), fx.replica.clone());
    let mut worker = SyncWorker::spawn(
        driver,
        Duration::from_secs(3600),
        None,
        CancellationToken::new(),
    )
    .unwrap();

    let started = Instant::now();
    worker.stop().unwrap();
    assert!(started.elapsed() < Duration::from_secs(60));
    assert!(worker.is_finished());
}

#[test]
fn test_stop_after_exit_is_noop() {
    let fx = SyncFixture::new();
    let driver = SyncDriver::new(fx.source.clone(), fx.replica.clone());
    let mut worker = SyncWorker::spawn(
        driver,
        Duration::from_millis(1),
        Some(1),
        CancellationToken::new(),
    )
    .unwrap();

    assert!(worker.join().unwrap().is_some());
    assert!(worker.stop().unwrap().is_none());
    assert!(worker.stop().unwrap().is_none());
}

#[test]
fn test_missing_source_does_not_kill_worker() {
    let fx = SyncFixture::new();
    let driver = SyncDriver::new(fx.source.join("absent"), fx.replica.clone());
    let mut worker = SyncWorker::spawn(
        driver,
        Duration::from_millis(1),
        Some(3),
        CancellationToken::new(),
    )
    .unwrap();

    let driver = worker.join().unwrap().unwrap();
    assert_eq!(driver.cycles_run(), 3);
    assert!(driver.store().is_empty());
}
