//! In-process shared store
//!
//! Every handle created through [`MemoryStore::connect`] sees the same blobs
//! and competes for the same region locks, which lets threads stand in for
//! independent processes.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use super::{LockMode, SharedStore};
use crate::error::StoreError;

#[derive(Debug)]
enum LockState {
    Shared(HashSet<u64>),
    Exclusive(u64),
}

#[derive(Debug, Default)]
struct MemoryState {
    blobs: HashMap<String, Vec<u8>>,
    locks: HashMap<String, LockState>,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<MemoryState>,
    released: Condvar,
    next_holder: AtomicU64,
}

// == Memory Store ==
/// Shared in-memory store. Locks belong to the handle that took them and are
/// not re-entrant: a handle shared between threads admits one writer at a time.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Arc<Inner>,
    holder: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::attach(Arc::new(Inner::default()))
    }

    /// Opens another handle onto the same store with its own lock identity.
    pub fn connect(&self) -> Self {
        Self::attach(Arc::clone(&self.inner))
    }

    fn attach(inner: Arc<Inner>) -> Self {
        let holder = inner.next_holder.fetch_add(1, Ordering::Relaxed);
        Self { inner, holder }
    }

    fn try_acquire(&self, state: &mut MemoryState, name: &str, mode: LockMode) -> bool {
        let granted = match state.locks.get(name) {
            None => true,
            Some(LockState::Exclusive(_)) => false,
            Some(LockState::Shared(readers)) => match mode {
                LockMode::Shared => true,
                LockMode::Exclusive => readers.len() == 1 && readers.contains(&self.holder),
            },
        };

        if !granted {
            return false;
        }

        match mode {
            LockMode::Exclusive => {
                state
                    .locks
                    .insert(name.to_string(), LockState::Exclusive(self.holder));
            }
            LockMode::Shared => {
                let lock = state
                    .locks
                    .entry(name.to_string())
                    .or_insert_with(|| LockState::Shared(HashSet::new()));
                if let LockState::Shared(readers) = lock {
                    readers.insert(self.holder);
                }
            }
        }
        true
    }

    fn release(&self, state: &mut MemoryState, name: &str) -> bool {
        let free = match state.locks.get_mut(name) {
            Some(LockState::Exclusive(owner)) => *owner == self.holder,
            Some(LockState::Shared(readers)) => {
                readers.remove(&self.holder);
                readers.is_empty()
            }
            None => false,
        };

        if free {
            state.locks.remove(name);
        }
        free
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStore for MemoryStore {
    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.inner.state.lock().blobs.contains_key(name))
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.inner.state.lock().blobs.get(name).cloned())
    }

    fn set(&self, name: &str, blob: &[u8]) -> Result<(), StoreError> {
        self.inner
            .state
            .lock()
            .blobs
            .insert(name.to_string(), blob.to_vec());
        Ok(())
    }

    fn lock(&self, name: &str, mode: LockMode, blocking: bool) -> Result<bool, StoreError> {
        let mut state = self.inner.state.lock();
        loop {
            if self.try_acquire(&mut state, name, mode) {
                debug!("Handle {} locked region '{}' ({:?})", self.holder, name, mode);
                return Ok(true);
            }
            if !blocking {
                return Ok(false);
            }
            self.inner.released.wait(&mut state);
        }
    }

    fn unlock(&self, name: &str) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock();
        if self.release(&mut state, name) {
            self.inner.released.notify_all();
        }
        Ok(())
    }
}

impl Drop for MemoryStore {
    /// Releases every lock this handle still holds, like a process exiting.
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        let held: Vec<String> = state
            .locks
            .iter()
            .filter(|(_, lock)| match lock {
                LockState::Exclusive(owner) => *owner == self.holder,
                LockState::Shared(readers) => readers.contains(&self.holder),
            })
            .map(|(name, _)| name.clone())
            .collect();

        if held.is_empty() {
            return;
        }
        for name in held {
            self.release(&mut state, &name);
        }
        self.inner.released.notify_all();
    }
}
