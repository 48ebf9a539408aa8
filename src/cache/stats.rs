//! Cache Statistics Module
//!
//! Per-handle counters: hits, misses, evictions and lock contention.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics observed through one cache handle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of `get` calls that returned a value
    pub hits: u64,
    /// Number of `get` calls that reported EXPIRED
    pub misses: u64,
    /// Number of keys removed by the eviction engine
    pub evictions: u64,
    /// Number of writes refused because another holder had the region lock
    pub contentions: u64,
    /// Number of keys in the region at the last read
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_contention(&mut self) {
        self.contentions += 1;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
