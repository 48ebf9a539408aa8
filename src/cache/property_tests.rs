//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache and eviction invariants over random
//! operation sequences.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{
    eviction_target, CacheConfig, ManualClock, SharedCache, Status, Timeout, METADATA_KEY,
};
use crate::storage::MemoryStore;

// == Test Configuration ==
const TEST_REGION: &str = "props";
const START_MS: u64 = 1_700_000_000_000;

fn test_cache(config: CacheConfig) -> (SharedCache<String>, ManualClock) {
    let clock = ManualClock::new(START_MS);
    let store = Arc::new(MemoryStore::new());
    let cache = SharedCache::with_clock(store, config, Arc::new(clock.clone())).unwrap();
    (cache, clock)
}

// == Strategies ==
/// Generates valid cache keys
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}".prop_filter("reserved key", |k| k != METADATA_KEY)
}

/// Generates cache values
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,256}".prop_map(|s| s)
}

/// Generates a list of distinct keys
fn distinct_keys(range: std::ops::Range<usize>) -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set(valid_key_strategy(), range).prop_map(|set| set.into_iter().collect())
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    let key = prop::sample::select(vec!["a", "b", "c", "d", "e", "f"]).prop_map(str::to_string);
    prop_oneof![
        (key.clone(), valid_value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key.clone().prop_map(|key| CacheOp::Get { key }),
        key.prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing a never-expiring value then reading it returns the same value.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in valid_value_strategy()) {
        let (cache, _) = test_cache(CacheConfig::new(TEST_REGION));

        cache.set(&key, value.clone(), Some(Timeout::Never)).unwrap();

        prop_assert_eq!(cache.get(&key).unwrap(), Some(value));
        prop_assert_eq!(cache.status(), Status::Success);
    }

    // Default-never entries never expire, however far the clock moves.
    #[test]
    fn prop_never_expiry_is_stable(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        steps in prop::collection::vec(0u64..10_000_000_000, 1..10)
    ) {
        let (cache, clock) = test_cache(CacheConfig::new(TEST_REGION));
        cache.set(&key, value.clone(), None).unwrap();

        for step in steps {
            clock.advance(Duration::from_millis(step));
            prop_assert_eq!(cache.get(&key).unwrap(), Some(value.clone()));
            prop_assert_eq!(cache.status(), Status::Success);
        }
    }

    // After the TTL elapses the key reads as EXPIRED, and keeps doing so.
    #[test]
    fn prop_ttl_expiration_behavior(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        ttl_ms in 1u64..1_000_000,
        overshoot_ms in 0u64..1_000_000
    ) {
        let (cache, clock) = test_cache(CacheConfig::new(TEST_REGION));
        cache.set(&key, value.clone(), Some(Timeout::After(Duration::from_millis(ttl_ms)))).unwrap();

        clock.advance(Duration::from_millis(ttl_ms - 1));
        prop_assert_eq!(cache.get(&key).unwrap(), Some(value));

        clock.advance(Duration::from_millis(1 + overshoot_ms));
        prop_assert_eq!(cache.get(&key).unwrap(), None);
        prop_assert_eq!(cache.status(), Status::Expired);
        prop_assert_eq!(cache.get(&key).unwrap(), None);
        prop_assert_eq!(cache.status(), Status::Expired);
    }

    // Delete returns the stored value and the key then reads as EXPIRED.
    #[test]
    fn prop_delete_removes_entry(key in valid_key_strategy(), value in valid_value_strategy()) {
        let (cache, _) = test_cache(CacheConfig::new(TEST_REGION));
        cache.set(&key, value.clone(), None).unwrap();

        prop_assert_eq!(cache.delete(&key).unwrap(), Some(value));
        prop_assert_eq!(cache.get(&key).unwrap(), None);
        prop_assert_eq!(cache.status(), Status::Expired);
    }

    // The last write to a key wins and the key is counted once.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let (cache, _) = test_cache(CacheConfig::new(TEST_REGION));

        cache.set(&key, value1, None).unwrap();
        cache.set(&key, value2.clone(), None).unwrap();

        prop_assert_eq!(cache.get(&key).unwrap(), Some(value2));
        prop_assert_eq!(cache.len().unwrap(), 1);
    }
}

// Property tests for the eviction engine behind `set`
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // The key count stays under the ceiling and the survivors are always the
    // most recently inserted keys.
    #[test]
    fn prop_capacity_keeps_most_recent(
        max_keys in 1usize..40,
        keys in distinct_keys(1..120)
    ) {
        let (cache, _) = test_cache(CacheConfig::new(TEST_REGION).with_max_keys(max_keys));

        for (inserted, key) in keys.iter().enumerate() {
            cache.set(key, format!("value_{}", key), None).unwrap();

            let len = cache.len().unwrap();
            prop_assert!(len <= max_keys, "{} keys exceed ceiling {}", len, max_keys);
            if max_keys >= 10 {
                prop_assert!(len < max_keys, "a full registry should have been trimmed");
            }

            let survivors = &keys[inserted + 1 - len..=inserted];
            for survivor in survivors {
                prop_assert!(cache.get(survivor).unwrap().is_some(), "'{}' should survive", survivor);
            }
        }

        if keys.len() >= max_keys {
            prop_assert!(cache.len().unwrap() >= eviction_target(max_keys));
        }
    }

    // Expired keys are evicted ahead of live ones whenever they alone bring
    // the registry back to its target.
    #[test]
    fn prop_expired_evicted_first(
        max_keys in 10usize..60,
        expired_mask in prop::collection::vec(any::<bool>(), 60)
    ) {
        let (cache, clock) = test_cache(CacheConfig::new(TEST_REGION).with_max_keys(max_keys));
        let excess = max_keys - eviction_target(max_keys);
        let expired_count = expired_mask[..max_keys - 1].iter().filter(|e| **e).count();
        prop_assume!(expired_count >= excess);

        let mut live = Vec::new();
        for (i, expires) in expired_mask[..max_keys - 1].iter().enumerate() {
            let key = format!("key{}", i);
            let timeout = if *expires {
                Timeout::After(Duration::from_secs(1))
            } else {
                live.push(key.clone());
                Timeout::Never
            };
            cache.set(&key, "v".to_string(), Some(timeout)).unwrap();
        }

        clock.advance(Duration::from_secs(2));
        cache.set("trigger", "v".to_string(), None).unwrap();

        prop_assert_eq!(cache.len().unwrap(), eviction_target(max_keys));
        for key in &live {
            prop_assert!(cache.get(key).unwrap().is_some(), "live key '{}' was evicted", key);
        }
        prop_assert!(cache.get("trigger").unwrap().is_some());
    }
}

// == Property Test for Error Response Format ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Every error converts to a JSON body carrying "error" and a failure status.
    #[test]
    fn prop_error_response_format(error_msg in "[a-zA-Z0-9 _-]{1,100}") {
        use crate::error::{CacheError, StoreError};
        use axum::body::to_bytes;
        use axum::response::IntoResponse;

        let error_variants = vec![
            CacheError::InvalidKey(error_msg.clone()),
            CacheError::ReservedKey(error_msg.clone()),
            CacheError::InvalidTimeout(error_msg.clone()),
            CacheError::Busy(error_msg.clone()),
            CacheError::Store(StoreError::Backend(error_msg.clone())),
            CacheError::Corrupt(error_msg.clone()),
        ];

        let rt = tokio::runtime::Runtime::new().unwrap();
        for error in error_variants {
            let expected_msg = error.to_string();
            let response = error.into_response();

            let content_type = response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok());
            prop_assert!(content_type.map(|ct| ct.contains("application/json")).unwrap_or(false));

            let bytes = rt.block_on(async { to_bytes(response.into_body(), usize::MAX).await.unwrap() });
            let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

            prop_assert_eq!(json["error"].as_str(), Some(expected_msg.as_str()));
            prop_assert_eq!(json["status"].as_str(), Some("failure"));
        }
    }
}

// == Property Test for Concurrent Handles ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    // Handles racing on one region never leave a broken registry behind, and
    // every value read back is one some writer stored for that key.
    #[test]
    fn prop_concurrent_handles_stay_consistent(
        operations in prop::collection::vec(cache_op_strategy(), 10..60)
    ) {
        let store = MemoryStore::new();
        let config = CacheConfig::new(TEST_REGION).with_max_keys(4);
        let written: HashSet<(String, String)> = operations
            .iter()
            .filter_map(|op| match op {
                CacheOp::Set { key, value } => Some((key.clone(), value.clone())),
                _ => None,
            })
            .collect();

        let caches: Vec<SharedCache<String>> = (0..4)
            .map(|_| SharedCache::new(Arc::new(store.connect()), config.clone()).unwrap())
            .collect();

        let observed: Vec<(String, String)> = std::thread::scope(|scope| {
            let workers: Vec<_> = caches
                .iter()
                .enumerate()
                .map(|(worker, cache)| {
                    let ops: Vec<CacheOp> = operations
                        .iter()
                        .skip(worker)
                        .step_by(caches.len())
                        .cloned()
                        .collect();
                    scope.spawn(move || {
                        let mut seen = Vec::new();
                        for op in ops {
                            match op {
                                CacheOp::Set { key, value } => {
                                    let _ = cache.set(&key, value, None);
                                }
                                CacheOp::Get { key } => {
                                    if let Ok(Some(value)) = cache.get(&key) {
                                        seen.push((key, value));
                                    }
                                }
                                CacheOp::Delete { key } => {
                                    let _ = cache.delete(&key);
                                }
                            }
                        }
                        seen
                    })
                })
                .collect();

            workers.into_iter().flat_map(|w| w.join().unwrap()).collect()
        });

        for pair in &observed {
            prop_assert!(written.contains(pair), "read {:?} that nobody wrote", pair);
        }

        let checker = SharedCache::<String>::new(Arc::new(store.connect()), config).unwrap();
        prop_assert!(checker.len().unwrap() <= 4);
    }
}
