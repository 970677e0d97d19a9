//! Property-based tests for determinism guarantees

use proptest::prelude::*;
use std::collections::BTreeMap;
use treesync::tree::hasher;
use treesync::types::{DirectoryEntry, FileEntry};
use treesync::{Classifier, MatchPolicy, Snapshot, SnapshotStore};

fn snapshot_from(files: &BTreeMap<String, Vec<u8>>) -> Snapshot {
    let names: Vec<&str> = files.keys().map(|k| k.as_str()).collect();
    let entries = files
        .iter()
        .map(|(name, content)| FileEntry::new(name.clone(), hasher::compute_content_hash(content)))
        .collect();
    Snapshot::new(vec![DirectoryEntry::new(
        ".",
        hasher::compute_directory_fingerprint(&names),
        entries,
    )])
}

fn file_map() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map("[a-e]{1,3}", prop::collection::vec(any::<u8>(), 0..4), 0..6)
}

proptest! {
    /// Same bytes always hash the same; different bytes (almost surely) differ
    #[test]
    fn content_hash_is_deterministic(a in any::<Vec<u8>>(), b in any::<Vec<u8>>()) {
        prop_assert_eq!(hasher::compute_content_hash(&a), hasher::compute_content_hash(&a));
        if a != b {
            prop_assert_ne!(hasher::compute_content_hash(&a), hasher::compute_content_hash(&b));
        }
    }

    /// Directory fingerprints depend on the set of names, not the order they were listed in
    #[test]
    fn directory_fingerprint_ignores_listing_order(mut names in prop::collection::vec("[a-z]{1,8}", 0..8)) {
        let forward = hasher::compute_directory_fingerprint(&names);
        names.reverse();
        prop_assert_eq!(forward, hasher::compute_directory_fingerprint(&names));
    }

    /// Comparing a snapshot with itself yields nothing under either policy
    #[test]
    fn unchanged_snapshot_has_no_changes(files in file_map()) {
        let snapshot = snapshot_from(&files);
        for policy in [MatchPolicy::Lenient, MatchPolicy::Strict] {
            let mut store = SnapshotStore::from_snapshot(snapshot.clone());
            prop_assert!(Classifier::new(policy).classify(&mut store, &snapshot).is_empty());
        }
    }

    /// A change set never contains the same record twice
    #[test]
    fn change_records_are_unique(before in file_map(), after in file_map()) {
        let mut store = SnapshotStore::from_snapshot(snapshot_from(&before));
        let records = Classifier::new(MatchPolicy::Strict)
            .classify(&mut store, &snapshot_from(&after))
            .changes
            .into_vec();
        let mut seen = std::collections::HashSet::new();
        for record in &records {
            prop_assert!(seen.insert(record.clone()));
        }
    }
}
