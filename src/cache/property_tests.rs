//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache against capacity, overwrite, deletion and
//! recency properties. Each case runs on its own runtime via
//! `tokio_test::block_on` so expiry timers can be armed.

use proptest::prelude::*;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use axum::response::IntoResponse;

use crate::cache::{BoundedTtlCache, ManualClock};
use crate::error::CacheError;

// == Test Configuration ==
const TEST_CAPACITY: usize = 100;
const TEST_TTL: Duration = Duration::from_secs(300);

type TestCache = BoundedTtlCache<String, String, ManualClock>;

/// Cache with a frozen clock: recency is decided by operation order alone.
fn new_cache(capacity: usize) -> TestCache {
    BoundedTtlCache::with_clock(TEST_TTL, capacity, ManualClock::default())
        .expect("valid cache configuration")
}

// == Strategies ==
/// Generates cache keys from a small alphabet so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-h]{1,2}"
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}"
}

/// Distinct keys for filling a cache
fn unique_keys_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-zA-Z0-9_]{1,16}", min..max)
        .prop_map(|keys| keys.into_iter().collect())
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Put { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

// == Reference Model ==
/// Plain LRU list: front = least recently used.
struct LruModel {
    order: VecDeque<(String, String)>,
    capacity: usize,
}

impl LruModel {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            capacity,
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.order.iter().position(|(k, _)| k == key)
    }

    fn put(&mut self, key: String, value: String) {
        if let Some(pos) = self.position(&key) {
            self.order.remove(pos);
        } else if self.order.len() >= self.capacity {
            self.order.pop_front();
        }
        self.order.push_back((key, value));
    }

    fn get(&mut self, key: &str) -> Option<String> {
        let pos = self.position(key)?;
        let entry = self.order.remove(pos)?;
        let value = entry.1.clone();
        self.order.push_back(entry);
        Some(value)
    }

    fn delete(&mut self, key: &str) {
        if let Some(pos) = self.position(key) {
            self.order.remove(pos);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Every get is either a hit or a miss, and the counters say which.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        tokio_test::block_on(async move {
            let cache = new_cache(TEST_CAPACITY);
            let mut expected_hits: u64 = 0;
            let mut expected_misses: u64 = 0;

            for op in ops {
                match op {
                    CacheOp::Put { key, value } => cache.put(key, value),
                    CacheOp::Get { key } => match cache.get(&key) {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    },
                    CacheOp::Delete { key } => cache.delete(&key),
                }
            }

            let stats = cache.stats();
            prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
            prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
            prop_assert_eq!(stats.total_entries, cache.len(), "Total entries mismatch");
            Ok::<(), TestCaseError>(())
        })?;
    }

    // A stored value comes back unchanged before expiry.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in value_strategy()) {
        tokio_test::block_on(async move {
            let cache = new_cache(TEST_CAPACITY);
            cache.put(key.clone(), value.clone());
            prop_assert_eq!(cache.get(&key), Some(value));
            Ok::<(), TestCaseError>(())
        })?;
    }

    // After delete, a get on the same key misses.
    #[test]
    fn prop_delete_removes_entry(key in key_strategy(), value in value_strategy()) {
        tokio_test::block_on(async move {
            let cache = new_cache(TEST_CAPACITY);
            cache.put(key.clone(), value);
            prop_assert!(cache.get(&key).is_some(), "Key should exist before delete");

            cache.delete(&key);

            prop_assert!(cache.get(&key).is_none(), "Key should not exist after delete");
            prop_assert!(cache.is_empty());
            Ok::<(), TestCaseError>(())
        })?;
    }

    // Writing the same key twice keeps one entry holding the second value.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy()
    ) {
        tokio_test::block_on(async move {
            let cache = new_cache(TEST_CAPACITY);
            cache.put(key.clone(), value1);
            cache.put(key.clone(), value2.clone());

            prop_assert_eq!(cache.get(&key), Some(value2), "Overwrite should return new value");
            prop_assert_eq!(cache.len(), 1, "Should have exactly one entry after overwrite");
            Ok::<(), TestCaseError>(())
        })?;
    }

    // The entry count never exceeds capacity, whatever keys are written.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec(("[a-z0-9]{1,8}", value_strategy()), 1..200),
        capacity in 1usize..20
    ) {
        tokio_test::block_on(async move {
            let cache = new_cache(capacity);
            for (key, value) in entries {
                cache.put(key, value);
                prop_assert!(
                    cache.len() <= capacity,
                    "Cache size {} exceeds capacity {}",
                    cache.len(),
                    capacity
                );
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    // With no reads, the first key written is the first evicted.
    #[test]
    fn prop_lru_eviction_order(
        keys in unique_keys_strategy(2, 10),
        new_value in value_strategy()
    ) {
        tokio_test::block_on(async move {
            let capacity = keys.len();
            let cache = new_cache(capacity);
            for key in &keys {
                cache.put(key.clone(), format!("value_{}", key));
            }
            prop_assert_eq!(cache.len(), capacity, "Cache should be at capacity");

            // Keys in the strategy never contain '-'
            let new_key = "new-key".to_string();
            cache.put(new_key.clone(), new_value);

            prop_assert_eq!(cache.len(), capacity);
            prop_assert!(!cache.contains(&keys[0]), "Oldest key '{}' should be evicted", keys[0]);
            prop_assert!(cache.contains(&new_key));
            for key in keys.iter().skip(1) {
                prop_assert!(cache.contains(key), "Key '{}' should still exist", key);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    // A read makes the key most recently used, so the next-oldest is evicted.
    #[test]
    fn prop_lru_access_tracking(keys in unique_keys_strategy(3, 8)) {
        tokio_test::block_on(async move {
            let cache = new_cache(keys.len());
            for key in &keys {
                cache.put(key.clone(), format!("value_{}", key));
            }

            prop_assert!(cache.get(&keys[0]).is_some());
            cache.put("new-key".to_string(), "value".to_string());

            prop_assert!(cache.contains(&keys[0]), "Accessed key should survive eviction");
            prop_assert!(!cache.contains(&keys[1]), "Next-oldest key should be evicted");
            Ok::<(), TestCaseError>(())
        })?;
    }

    // Any interleaving of operations agrees with a straightforward LRU list.
    #[test]
    fn prop_matches_reference_lru(
        ops in prop::collection::vec(cache_op_strategy(), 1..120),
        capacity in 1usize..6
    ) {
        tokio_test::block_on(async move {
            let cache = new_cache(capacity);
            let mut model = LruModel::new(capacity);

            for op in ops {
                match op {
                    CacheOp::Put { key, value } => {
                        cache.put(key.clone(), value.clone());
                        model.put(key, value);
                    }
                    CacheOp::Get { key } => {
                        prop_assert_eq!(cache.get(&key), model.get(&key), "Get({}) diverged", key);
                    }
                    CacheOp::Delete { key } => {
                        cache.delete(&key);
                        model.delete(&key);
                    }
                }
                prop_assert_eq!(cache.len(), model.order.len());
            }

            let live: HashSet<&String> = model.order.iter().map(|(k, _)| k).collect();
            for key in live {
                prop_assert!(cache.contains(key));
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}

// == Property Test for Error Response Format ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Every error renders as JSON with an "error" field.
    #[test]
    fn prop_error_response_format(message in "[a-zA-Z0-9 ]{1,64}") {
        let errors = vec![
            CacheError::NotFound(message.clone()),
            CacheError::InvalidRequest(message.clone()),
            CacheError::InvalidConfig(message.clone()),
        ];

        for error in errors {
            let response = error.into_response();
            let body = tokio_test::block_on(axum::body::to_bytes(response.into_body(), usize::MAX))
                .expect("readable body");
            let json: serde_json::Value = serde_json::from_slice(&body).expect("JSON body");

            let text = json["error"].as_str().unwrap_or_default();
            prop_assert!(text.contains(message.as_str()), "Error body '{}' lacks message", text);
        }
    }
}
