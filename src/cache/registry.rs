//! Cache Registry Module
//!
//! The single record a region persists: every entry, its expiry, and the
//! insertion-ordered queue the eviction engine walks.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::Expiry;
use crate::error::{CacheError, Result};

/// Key reserved for registry bookkeeping; never accepted by `set`.
pub const METADATA_KEY: &str = "_cache_metadata";

// == Cache Registry ==
/// Entries, expirations and eviction queue of one region.
///
/// `entries` and `expirations` always share the same key set, and `queue`
/// holds each of those keys exactly once, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRegistry<V> {
    entries: HashMap<String, V>,
    expirations: HashMap<String, Expiry>,
    queue: VecDeque<String>,
}

impl<V> Default for CacheRegistry<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            expirations: HashMap::new(),
            queue: VecDeque::new(),
        }
    }
}

impl<V> CacheRegistry<V> {
    pub fn new() -> Self {
        Self::default()
    }

    // == Insert ==
    /// Inserts or overwrites `key` and moves it to the tail of the queue.
    pub fn insert(&mut self, key: String, value: V, expiry: Expiry) {
        if self.entries.contains_key(&key) {
            self.queue.retain(|k| k != &key);
        }
        self.entries.insert(key.clone(), value);
        self.expirations.insert(key.clone(), expiry);
        self.queue.push_back(key);
    }

    // == Remove ==
    /// Removes `key` from entries, expirations and queue together.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let value = self.entries.remove(key)?;
        self.expirations.remove(key);
        self.queue.retain(|k| k != key);
        Some(value)
    }

    /// Removes the least recently inserted key.
    pub fn pop_oldest(&mut self) -> Option<String> {
        let key = self.queue.pop_front()?;
        self.entries.remove(&key);
        self.expirations.remove(&key);
        Some(key)
    }

    /// Removes every key whose expiry has elapsed at `now_ms`.
    pub fn remove_expired(&mut self, now_ms: u64) -> Vec<String> {
        let expired: Vec<String> = self
            .queue
            .iter()
            .filter(|key| self.is_expired(key, now_ms))
            .cloned()
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired
    }

    // == Lookups ==
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn expiry(&self, key: &str) -> Option<Expiry> {
        self.expirations.get(key).copied()
    }

    /// True if `key` is past its expiry. A missing expiry counts as expired.
    pub fn is_expired(&self, key: &str, now_ms: u64) -> bool {
        self.expiry(key).map_or(true, |expiry| expiry.is_expired(now_ms))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys from oldest to most recently inserted.
    pub fn queue(&self) -> &VecDeque<String> {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    // == Validate ==
    /// Checks the structural invariants of a registry read from the store.
    pub fn validate(&self) -> Result<()> {
        if self.entries.len() != self.expirations.len()
            || self.entries.keys().any(|k| !self.expirations.contains_key(k))
        {
            return Err(CacheError::Corrupt(
                "entry and expiration keys differ".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.queue.len());
        for key in &self.queue {
            if !self.entries.contains_key(key) {
                return Err(CacheError::Corrupt(format!(
                    "queue references unknown key '{}'",
                    key
                )));
            }
            if !seen.insert(key.as_str()) {
                return Err(CacheError::Corrupt(format!(
                    "queue holds key '{}' more than once",
                    key
                )));
            }
        }

        if seen.len() != self.entries.len() {
            return Err(CacheError::Corrupt(
                "queue is missing entries".to_string(),
            ));
        }

        Ok(())
    }
}

// == Encoding ==
impl<V> CacheRegistry<V>
where
    V: Serialize + DeserializeOwned,
{
    /// Serializes the registry into the blob stored for its region.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Decodes and validates a stored blob.
    pub fn decode(blob: &[u8]) -> Result<Self> {
        let registry: Self =
            serde_json::from_slice(blob).map_err(|e| CacheError::Corrupt(e.to_string()))?;
        registry.validate()?;
        Ok(registry)
    }
}
