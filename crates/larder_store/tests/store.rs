// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `EntryStore`.

use std::time::{Duration, Instant};

use larder_store::{CacheEntry, EntryStore};

fn populated(capacity: usize, keys: &[&str]) -> (EntryStore<String, i32>, Instant) {
    let mut store = EntryStore::new(capacity);
    let now = Instant::now();
    for (i, key) in keys.iter().enumerate() {
        store.insert_or_update((*key).to_string(), i32::try_from(i).expect("small index"), now);
    }
    (store, now)
}

#[test]
fn capacity_invariant_holds_across_inserts() {
    let mut store = EntryStore::new(3);
    let now = Instant::now();

    for i in 0..50 {
        store.insert_or_update(format!("key{i}"), i, now);
        assert!(store.len() <= 3, "store exceeded capacity after insert {i}");
    }
}

#[test]
fn eviction_follows_recency_not_insertion() {
    let (mut store, now) = populated(3, &["a", "b", "c"]);

    // Reading "a" makes it the most recent; "b" is now the oldest.
    store.touch(&"a".to_string(), now);
    store.insert_or_update("d".to_string(), 9, now);

    assert!(store.contains_key(&"a".to_string()));
    assert!(!store.contains_key(&"b".to_string()));
    assert!(store.contains_key(&"c".to_string()));
    assert!(store.contains_key(&"d".to_string()));
}

#[test]
fn repeated_overflow_evicts_in_order() {
    let (mut store, now) = populated(2, &["a", "b"]);

    store.insert_or_update("c".to_string(), 3, now);
    store.insert_or_update("d".to_string(), 4, now);

    assert_eq!(store.keys(), vec!["d".to_string(), "c".to_string()]);
}

#[test]
fn shrink_below_count_evicts_immediately() {
    let (mut store, _) = populated(5, &["a", "b", "c", "d", "e"]);

    store.set_capacity(1);

    assert_eq!(store.len(), 1);
    assert_eq!(store.keys(), vec!["e".to_string()]);
}

#[test]
fn lookup_does_not_change_recency() {
    let (mut store, now) = populated(2, &["a", "b"]);

    // A bare lookup is not a use; "a" stays oldest and is evicted.
    let _ = store.lookup(&"a".to_string());
    store.insert_or_update("c".to_string(), 3, now);

    assert!(!store.contains_key(&"a".to_string()));
}

#[test]
fn timestamps_round_trip_through_lookup() {
    let mut store = EntryStore::new(4);
    let t0 = Instant::now();
    let t1 = t0 + Duration::from_millis(250);

    store.insert_or_update("a".to_string(), 7, t0);
    store.touch(&"a".to_string(), t1);

    let entry = store.lookup(&"a".to_string()).expect("entry should exist");
    assert_eq!(entry.into_value(), 7);

    let entry = store.lookup(&"a".to_string()).expect("entry should exist");
    assert_eq!(entry.last_access(), t1);
    assert_eq!(entry.last_write(), t0);
}

#[test]
fn keys_snapshot_does_not_track_later_changes() {
    let (mut store, now) = populated(4, &["a", "b"]);

    let snapshot = store.keys();
    store.insert_or_update("c".to_string(), 3, now);

    assert_eq!(snapshot.len(), 2);
    assert_eq!(store.keys().len(), 3);
}

#[test]
fn remove_then_reinsert_starts_fresh() {
    let mut store = EntryStore::new(2);
    let t0 = Instant::now();
    let t1 = t0 + Duration::from_secs(10);

    store.insert_or_update("a".to_string(), 1, t0);
    assert!(store.remove(&"a".to_string()));
    store.insert_or_update("a".to_string(), 2, t1);

    let entry = store.lookup(&"a".to_string()).expect("entry should exist");
    assert_eq!(*entry.value(), 2);
    assert_eq!(entry.last_write(), t1);
    assert_eq!(entry.last_access(), t1);
}

#[test]
fn works_with_non_string_keys() {
    let mut store: EntryStore<u64, CacheEntry<i32>> = EntryStore::new(2);
    let now = Instant::now();
    store.insert_or_update(1, CacheEntry::new(10, now), now);

    assert!(store.contains_key(&1));
    assert!(!store.contains_key(&2));
}

#[test]
fn assert_auto_traits() {
    static_assertions::assert_impl_all!(EntryStore<String, i32>: Send, Sync);
}
