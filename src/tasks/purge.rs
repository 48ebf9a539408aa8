//! Expiry Purge Task
//!
//! Background task that periodically drops expired entries from the shared
//! registry, so keys nobody reads again do not count against the ceiling.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::SharedCache;

/// Spawns a background task that periodically purges expired cache entries.
///
/// The purge takes the region lock without waiting. When another writer
/// holds it the run is skipped and retried on the next tick.
///
/// # Arguments
/// * `cache` - Shared handle on the cache region
/// * `interval_secs` - Interval in seconds between purge runs
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_purge_task(state.cache.clone(), 60);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_purge_task<V>(cache: Arc<SharedCache<V>>, interval_secs: u64) -> JoinHandle<()>
where
    V: serde::Serialize + serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
{
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expiry purge task for '{}' with interval of {} seconds",
            cache.name(),
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            match cache.purge_expired() {
                Ok(0) => debug!("Expiry purge: nothing to remove"),
                Ok(removed) => info!("Expiry purge: removed {} expired entries", removed),
                Err(e) => warn!("Expiry purge failed: {}", e),
            }
        }
    })
}
