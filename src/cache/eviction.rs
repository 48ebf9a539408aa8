//! Eviction Engine
//!
//! Keeps a registry below its key ceiling. Reaching the ceiling trims the
//! registry to ~90% of it. Expired keys go first, scanning
//! from the most recent insertion backwards; if that is not enough the oldest
//! keys are dropped regardless of expiry.

use crate::cache::CacheRegistry;

/// Occupancy a full registry is trimmed down to: ~90% of `max_keys`.
pub fn eviction_target(max_keys: usize) -> usize {
    max_keys - max_keys / 10
}

/// Trims `registry` once it holds `max_keys` keys or more.
///
/// A `max_keys` of `None` or zero disables eviction. Returns the removed keys
/// in removal order.
pub fn evict<V>(registry: &mut CacheRegistry<V>, max_keys: Option<usize>, now_ms: u64) -> Vec<String> {
    let max_keys = match max_keys {
        Some(max) if max > 0 => max,
        _ => return Vec::new(),
    };

    if registry.len() < max_keys {
        return Vec::new();
    }

    let target = eviction_target(max_keys);
    let excess = registry.len() - target;

    // Stops at the first `excess` expired keys, so older expired keys may survive.
    let mut evicted: Vec<String> = registry
        .queue()
        .iter()
        .rev()
        .filter(|key| registry.is_expired(key, now_ms))
        .take(excess)
        .cloned()
        .collect();

    for key in &evicted {
        registry.remove(key);
    }

    while registry.len() > target {
        match registry.pop_oldest() {
            Some(key) => evicted.push(key),
            None => break,
        }
    }

    evicted
}
