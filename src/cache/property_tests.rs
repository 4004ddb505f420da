//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify namespace invariants across arbitrary operation
//! sequences.

use proptest::prelude::*;
use std::time::Duration;

use serde_json::Value;

use crate::cache::{CacheEntry, CacheNamespace, MAX_KEY_LENGTH};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 8;
const TEST_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,31}".prop_map(|s| s)
}

/// Generates valid cache values
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}".prop_map(|s| s)
}

fn entry(value: &str) -> CacheEntry<Value> {
    CacheEntry::new(Value::String(value.to_string()), TEST_TTL)
}

/// Generates a sequence of namespace operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Insert { key: String, value: String },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Insert { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any sequence of operations, the namespace never exceeds its
    // configured capacity.
    #[test]
    fn prop_capacity_never_exceeded(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let mut ns = CacheNamespace::new(TEST_MAX_ENTRIES);

        for op in ops {
            match op {
                CacheOp::Insert { key, value } => {
                    ns.insert(&key, entry(&value)).unwrap();
                }
                CacheOp::Get { key } => {
                    let _ = ns.get(&key);
                }
                CacheOp::Remove { key } => {
                    let _ = ns.remove(&key);
                }
            }
            prop_assert!(ns.len() <= TEST_MAX_ENTRIES, "Capacity exceeded");
        }
    }

    // For any sequence of operations, hit/miss statistics reflect exactly
    // the reads that occurred (entries never expire under the test TTL).
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut ns = CacheNamespace::new(TEST_MAX_ENTRIES);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Insert { key, value } => {
                    ns.insert(&key, entry(&value)).unwrap();
                }
                CacheOp::Get { key } => {
                    match ns.get(&key) {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    }
                }
                CacheOp::Remove { key } => {
                    let _ = ns.remove(&key);
                }
            }
        }

        let stats = ns.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, ns.len(), "Total entries mismatch");
    }

    // For any valid key-value pair, inserting then reading returns the
    // exact value that was stored.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in valid_value_strategy()) {
        let mut ns = CacheNamespace::new(TEST_MAX_ENTRIES);

        ns.insert(&key, entry(&value)).unwrap();

        let retrieved = ns.get(&key).unwrap();
        prop_assert_eq!(retrieved.data, Value::String(value), "Round-trip value mismatch");
    }

    // For any key present in the namespace, after a remove a subsequent
    // read finds nothing.
    #[test]
    fn prop_remove_removes_entry(key in valid_key_strategy(), value in valid_value_strategy()) {
        let mut ns = CacheNamespace::new(TEST_MAX_ENTRIES);

        ns.insert(&key, entry(&value)).unwrap();
        prop_assert!(ns.get(&key).is_some(), "Key should exist before remove");

        ns.remove(&key);
        prop_assert!(ns.get(&key).is_none(), "Key should not exist after remove");
    }

    // For any key, inserting V1 then V2 results in reads returning V2.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        v1 in valid_value_strategy(),
        v2 in valid_value_strategy(),
    ) {
        let mut ns = CacheNamespace::new(TEST_MAX_ENTRIES);

        ns.insert(&key, entry(&v1)).unwrap();
        ns.insert(&key, entry(&v2)).unwrap();

        let retrieved = ns.get(&key).unwrap();
        prop_assert_eq!(retrieved.data, Value::String(v2), "Overwrite not visible");
        prop_assert_eq!(ns.len(), 1, "Overwrite must not grow the namespace");
    }

    // Filling the namespace with distinct keys evicts in insertion order:
    // after inserting keys k0..k(N+extra), the first `extra` keys are gone
    // and the remaining N are present.
    #[test]
    fn prop_fifo_eviction_order(extra in 1usize..5) {
        let mut ns = CacheNamespace::new(TEST_MAX_ENTRIES);
        let total = TEST_MAX_ENTRIES + extra;

        for i in 0..total {
            ns.insert(&format!("key{i}"), entry("v")).unwrap();
        }

        prop_assert_eq!(ns.len(), TEST_MAX_ENTRIES);
        for i in 0..extra {
            prop_assert!(!ns.contains(&format!("key{i}")), "key{} should be evicted", i);
        }
        for i in extra..total {
            prop_assert!(ns.contains(&format!("key{i}")), "key{} should be present", i);
        }
        prop_assert_eq!(ns.stats().evictions, extra as u64);
    }

    // Keys never exceed the configured length limit without an error.
    #[test]
    fn prop_long_keys_rejected(len in (MAX_KEY_LENGTH + 1)..(MAX_KEY_LENGTH + 64)) {
        let mut ns = CacheNamespace::new(TEST_MAX_ENTRIES);
        let key = "x".repeat(len);

        prop_assert!(ns.insert(&key, entry("v")).is_err());
        prop_assert_eq!(ns.len(), 0);
    }
}
