//! Storage Module
//!
//! Shared stores the cache persists its registry into. A store holds one blob
//! per region name and offers an advisory lock scoped to that region.

mod file;
mod memory;

use std::fmt;

use tracing::warn;

use crate::error::StoreError;

pub use file::FileStore;
pub use memory::MemoryStore;

// == Lock Mode ==
/// Advisory lock flavours a store can grant on a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

// == Shared Store Trait ==
/// Blob storage visible to every cache handle sharing a region.
///
/// Implementations must make `set` atomic: readers see either the previous
/// blob or the new one, never a partial write.
pub trait SharedStore: Send + Sync + fmt::Debug {
    /// Check if a region blob exists
    fn exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Read a region blob, `None` if it was never written
    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Atomically replace a region blob
    fn set(&self, name: &str, blob: &[u8]) -> Result<(), StoreError>;

    /// Acquire the region lock for this handle.
    ///
    /// Returns `false` when `blocking` is off and another handle holds a
    /// conflicting lock.
    fn lock(&self, name: &str, mode: LockMode, blocking: bool) -> Result<bool, StoreError>;

    /// Release the region lock. A no-op if this handle does not hold it.
    fn unlock(&self, name: &str) -> Result<(), StoreError>;
}

// == Region Lock Guard ==
/// Exclusive region lock released when dropped.
pub struct RegionLock<'a> {
    store: &'a dyn SharedStore,
    name: &'a str,
}

impl<'a> RegionLock<'a> {
    /// Tries once to take the exclusive lock; `None` if it is held elsewhere.
    pub fn try_exclusive(store: &'a dyn SharedStore, name: &'a str) -> Result<Option<Self>, StoreError> {
        if store.lock(name, LockMode::Exclusive, false)? {
            Ok(Some(Self { store, name }))
        } else {
            Ok(None)
        }
    }
}

impl Drop for RegionLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.store.unlock(self.name) {
            warn!("Failed to release lock on region '{}': {}", self.name, e);
        }
    }
}
