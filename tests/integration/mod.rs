//! Integration tests for the treesync replication engine

mod config_loading;
mod snapshot_determinism;
mod sync_cycle;
mod test_utils;
mod worker_lifecycle;
