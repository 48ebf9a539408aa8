//! Shared Cache Module
//!
//! Cache façade over a [`SharedStore`] region. Writers take the region's
//! exclusive lock without waiting and give up immediately if another holder
//! has it; readers never lock.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::cache::{
    evict, CacheRegistry, CacheStats, Clock, Status, SystemClock, Timeout, METADATA_KEY,
};
use crate::error::{CacheError, Result};
use crate::storage::{RegionLock, SharedStore};

// == Cache Config ==
/// Construction parameters of a [`SharedCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Region the registry is stored under
    pub name: String,
    /// Expiry applied when `set` is called without a timeout
    pub default_expiry: Timeout,
    /// Key ceiling; `None` or zero disables eviction
    pub max_keys: Option<usize>,
    /// Byte ceiling. Accepted but not enforced.
    pub max_size: Option<u64>,
}

impl CacheConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_expiry: Timeout::Never,
            max_keys: None,
            max_size: None,
        }
    }

    pub fn with_default_expiry(mut self, default_expiry: Timeout) -> Self {
        self.default_expiry = default_expiry;
        self
    }

    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }
}

#[derive(Debug, Default)]
struct Outcome {
    status: Status,
    error: Option<String>,
}

// == Shared Cache ==
/// Expiring, key-bounded cache stored as one registry blob per region.
///
/// Every handle built over the same store and region name sees the same
/// entries. Status and statistics are tracked per handle.
#[derive(Debug)]
pub struct SharedCache<V = String> {
    store: Arc<dyn SharedStore>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    outcome: Mutex<Outcome>,
    stats: Mutex<CacheStats>,
    _value: PhantomData<fn() -> V>,
}

impl<V> SharedCache<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    // == Constructor ==
    /// Opens the cache region, creating an empty registry if none exists.
    pub fn new(store: Arc<dyn SharedStore>, config: CacheConfig) -> Result<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Same as [`SharedCache::new`] with an explicit time source.
    pub fn with_clock(
        store: Arc<dyn SharedStore>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if config.name.trim().is_empty() {
            return Err(CacheError::InvalidConfig(
                "cache name cannot be empty".to_string(),
            ));
        }

        if let Some(max_size) = config.max_size {
            warn!(
                "Cache '{}': max_size={} is accepted but size-based eviction is not implemented",
                config.name, max_size
            );
        }

        if !store.exists(&config.name)? {
            Self::create_registry(store.as_ref(), &config.name)?;
        }

        info!(
            "Opened cache '{}' (default_expiry: {}, max_keys: {:?})",
            config.name, config.default_expiry, config.max_keys
        );

        Ok(Self {
            store,
            clock,
            config,
            outcome: Mutex::new(Outcome::default()),
            stats: Mutex::new(CacheStats::new()),
            _value: PhantomData,
        })
    }

    /// Writes an empty registry unless someone else got there first. Creation
    /// is skipped while another holder has the lock, since that holder is
    /// either creating the region or writing to it.
    fn create_registry(store: &dyn SharedStore, name: &str) -> Result<()> {
        let Some(_lock) = RegionLock::try_exclusive(store, name)? else {
            debug!("Region '{}' is locked, leaving creation to the holder", name);
            return Ok(());
        };

        if store.exists(name)? {
            return Ok(());
        }
        let blob = CacheRegistry::<V>::new().encode()?;
        store.set(name, &blob)?;
        info!("Created registry for cache region '{}'", name);
        Ok(())
    }

    // == Set ==
    /// Stores `value` under `key`, expiring per `timeout` or the configured
    /// default.
    ///
    /// Fails with [`CacheError::Busy`] instead of waiting when another holder
    /// is writing the region. A successful insert may evict other keys.
    pub fn set(&self, key: &str, value: V, timeout: Option<Timeout>) -> Result<V> {
        self.begin();
        let result = self.store_value(key, value, timeout);
        self.track(result)
    }

    /// Like [`SharedCache::set`], with the timeout given as a descriptor
    /// such as `"30s"`, `"never"` or an RFC 3339 instant.
    pub fn set_with_descriptor(&self, key: &str, value: V, timeout: Option<&str>) -> Result<V> {
        self.begin();
        let result = timeout
            .map(str::parse::<Timeout>)
            .transpose()
            .and_then(|timeout| self.store_value(key, value, timeout));
        self.track(result)
    }

    fn store_value(&self, key: &str, value: V, timeout: Option<Timeout>) -> Result<V> {
        validate_key(key)?;
        if key == METADATA_KEY {
            return Err(CacheError::ReservedKey(key.to_string()));
        }

        let now = self.clock.now_ms();
        let expiry = timeout.unwrap_or(self.config.default_expiry).resolve(now);

        let Some(_lock) = RegionLock::try_exclusive(self.store.as_ref(), &self.config.name)? else {
            self.stats.lock().record_contention();
            warn!("Cache '{}': set '{}' refused, region is locked", self.config.name, key);
            return Err(CacheError::Busy(self.config.name.clone()));
        };

        let mut registry = self.load()?;
        registry.insert(key.to_string(), value.clone(), expiry);

        let evicted = evict(&mut registry, self.config.max_keys, now);
        if !evicted.is_empty() {
            debug!(
                "Cache '{}': evicted {} keys after inserting '{}'",
                self.config.name,
                evicted.len(),
                key
            );
            self.stats.lock().record_evictions(evicted.len());
        }

        self.persist(&registry)?;
        debug!("Cache '{}': set '{}' ({:?})", self.config.name, key, expiry);
        Ok(value)
    }

    // == Get ==
    /// Returns the value for `key`, or `None` when it is absent or expired.
    ///
    /// `None` leaves the status at [`Status::Expired`]. An expired entry is
    /// also deleted on a best-effort basis.
    pub fn get(&self, key: &str) -> Result<Option<V>> {
        self.begin();
        if let Err(e) = validate_key(key) {
            return self.track(Err(e));
        }

        let registry = match self.load() {
            Ok(registry) => registry,
            Err(e) => return self.track(Err(e)),
        };
        self.stats.lock().set_total_entries(registry.len());

        let Some(value) = registry.get(key) else {
            self.stats.lock().record_miss();
            self.finish(Status::Expired, None);
            return Ok(None);
        };

        if registry.is_expired(key, self.clock.now_ms()) {
            self.stats.lock().record_miss();
            debug!("Cache '{}': '{}' expired", self.config.name, key);

            // Cleanup failure only updates the message; the status stays EXPIRED.
            let cleanup_error = self.remove(key, true).err().map(|e| e.to_string());
            self.finish(Status::Expired, cleanup_error);
            return Ok(None);
        }

        self.stats.lock().record_hit();
        self.finish(Status::Success, None);
        Ok(Some(value.clone()))
    }

    // == Delete ==
    /// Removes `key` and returns its value.
    ///
    /// Returns `None` both when the key is absent and when the region is
    /// locked by another holder.
    pub fn delete(&self, key: &str) -> Result<Option<V>> {
        self.begin();
        let result = validate_key(key).and_then(|_| self.remove(key, false));
        self.track(result)
    }

    /// With `only_expired`, a key that was re-set since it was read as
    /// expired is left alone.
    fn remove(&self, key: &str, only_expired: bool) -> Result<Option<V>> {
        let Some(_lock) = RegionLock::try_exclusive(self.store.as_ref(), &self.config.name)? else {
            self.stats.lock().record_contention();
            debug!("Cache '{}': delete '{}' skipped, region is locked", self.config.name, key);
            return Ok(None);
        };

        let mut registry = self.load()?;
        if only_expired && !registry.is_expired(key, self.clock.now_ms()) {
            return Ok(None);
        }
        let removed = registry.remove(key);
        if removed.is_some() {
            self.persist(&registry)?;
            debug!("Cache '{}': deleted '{}'", self.config.name, key);
        }
        Ok(removed)
    }

    // == Purge Expired ==
    /// Removes every expired entry. Returns the number removed, zero if the
    /// region was locked by another holder.
    pub fn purge_expired(&self) -> Result<usize> {
        self.begin();
        let result = self.remove_expired();
        self.track(result)
    }

    fn remove_expired(&self) -> Result<usize> {
        let Some(_lock) = RegionLock::try_exclusive(self.store.as_ref(), &self.config.name)? else {
            self.stats.lock().record_contention();
            return Ok(0);
        };

        let mut registry = self.load()?;
        let removed = registry.remove_expired(self.clock.now_ms());
        if !removed.is_empty() {
            self.persist(&registry)?;
        }
        Ok(removed.len())
    }

    // == Inspection ==
    /// Number of keys in the region, including expired ones not yet purged.
    pub fn len(&self) -> Result<usize> {
        let len = self.load()?.len();
        self.stats.lock().set_total_entries(len);
        Ok(len)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Status of the most recent operation on this handle.
    pub fn status(&self) -> Status {
        self.outcome.lock().status
    }

    /// Error description left by the most recent operation, if any.
    pub fn last_error(&self) -> Option<String> {
        self.outcome.lock().error.clone()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    // == Registry I/O ==
    /// Reads the region's registry. A region wiped from the store reads as empty.
    fn load(&self) -> Result<CacheRegistry<V>> {
        match self.store.get(&self.config.name)? {
            Some(blob) => CacheRegistry::decode(&blob).map_err(|e| {
                error!("Cache '{}': {}", self.config.name, e);
                e
            }),
            None => Ok(CacheRegistry::new()),
        }
    }

    fn persist(&self, registry: &CacheRegistry<V>) -> Result<()> {
        let blob = registry.encode()?;
        self.store.set(&self.config.name, &blob)?;
        self.stats.lock().set_total_entries(registry.len());
        Ok(())
    }

    // == Outcome Tracking ==
    fn begin(&self) {
        *self.outcome.lock() = Outcome::default();
    }

    fn finish(&self, status: Status, error: Option<String>) {
        *self.outcome.lock() = Outcome { status, error };
    }

    fn track<T>(&self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.finish(Status::Success, None),
            Err(e) => self.finish(e.status(), Some(e.to_string())),
        }
        result
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
    }
    Ok(())
}
