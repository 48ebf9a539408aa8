//! Region Cache - an expiring, key-bounded cache over a shared store
//!
//! Entries live in one registry per named region. Writers take the region's
//! lock without waiting and back off when it is held, leaving the caller to
//! recompute rather than block.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheConfig, SharedCache, Status, Timeout};
pub use config::Config;
pub use error::{CacheError, StoreError};
pub use storage::{FileStore, MemoryStore, SharedStore};
pub use tasks::spawn_purge_task;
