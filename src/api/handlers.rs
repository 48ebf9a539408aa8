//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, info};

use crate::cache::SharedCache;
use crate::config::Config;
use crate::error::Result;
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, SetRequest, SetResponse, StatsResponse,
};
use crate::storage::{FileStore, MemoryStore, SharedStore};

/// Application state shared across all handlers.
///
/// The cache handles its own locking, so handlers share it through a plain `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<SharedCache<String>>,
}

impl AppState {
    /// Creates a new AppState around an opened cache.
    pub fn new(cache: SharedCache<String>) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Uses a [`FileStore`] when `store_dir` is set, otherwise an in-memory store.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn SharedStore> = match &config.store_dir {
            Some(dir) => Arc::new(FileStore::open(dir)?),
            None => {
                info!("No STORE_DIR set, using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        let cache = SharedCache::new(store, config.cache_config()?)?;
        Ok(Self::new(cache))
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair. A busy region answers 409 right away; callers
/// are expected to recompute the value instead of retrying.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    state
        .cache
        .set_with_descriptor(&req.key, req.value, req.ttl.as_deref())
        .map_err(|e| {
            if e.is_busy() {
                debug!("Set '{}' hit a busy region", req.key);
            }
            e
        })?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Answers 404 with status `expired` for keys that are expired or were never set.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<(StatusCode, Json<GetResponse>)> {
    match state.cache.get(&key)? {
        Some(value) => Ok((StatusCode::OK, Json(GetResponse::hit(key, value)))),
        None => Ok((StatusCode::NOT_FOUND, Json(GetResponse::expired(key)))),
    }
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let removed = state.cache.delete(&key)?;
    Ok(Json(DeleteResponse::new(key, removed)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    // Refreshes the entry count from the store
    state.cache.len()?;
    Ok(Json(StatsResponse::from(state.cache.stats())))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, Status};
    use crate::error::CacheError;
    use crate::storage::LockMode;

    fn test_state() -> AppState {
        let store = Arc::new(MemoryStore::new());
        AppState::new(SharedCache::new(store, CacheConfig::new("api")).unwrap())
    }

    fn set_request(key: &str, value: &str, ttl: Option<&str>) -> SetRequest {
        SetRequest {
            key: key.to_string(),
            value: value.to_string(),
            ttl: ttl.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state();

        let result = set_handler(State(state.clone()), Json(set_request("test_key", "test_value", None))).await;
        assert!(result.is_ok());

        let (status, response) = get_handler(State(state), Path("test_key".to_string()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.value.as_deref(), Some("test_value"));
        assert_eq!(response.status, Status::Success);
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state();

        let (status, response) = get_handler(State(state), Path("nonexistent".to_string()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(response.status, Status::Expired);
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = test_state();
        set_handler(State(state.clone()), Json(set_request("to_delete", "value", None)))
            .await
            .unwrap();

        let response = delete_handler(State(state.clone()), Path("to_delete".to_string()))
            .await
            .unwrap();
        assert!(response.deleted);
        assert_eq!(response.value.as_deref(), Some("value"));

        let (status, _) = get_handler(State(state), Path("to_delete".to_string()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_set_invalid_requests() {
        let state = test_state();

        let result = set_handler(State(state.clone()), Json(set_request("", "value", None))).await;
        assert!(matches!(result, Err(CacheError::InvalidKey(_))));

        let result = set_handler(State(state.clone()), Json(set_request("k", "v", Some("later")))).await;
        assert!(matches!(result, Err(CacheError::InvalidTimeout(_))));

        let result = set_handler(State(state), Json(set_request("_cache_metadata", "v", None))).await;
        assert!(matches!(result, Err(CacheError::ReservedKey(_))));
    }

    #[tokio::test]
    async fn test_set_busy_region() {
        let store = MemoryStore::new();
        let holder = store.connect();
        let state = AppState::new(SharedCache::new(Arc::new(store), CacheConfig::new("api")).unwrap());
        assert!(holder.lock("api", LockMode::Exclusive, false).unwrap());

        let result = set_handler(State(state), Json(set_request("k", "v", None))).await;
        assert!(matches!(result, Err(CacheError::Busy(_))));
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        set_handler(State(state.clone()), Json(set_request("k", "v", None)))
            .await
            .unwrap();

        let response = stats_handler(State(state)).await.unwrap();
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 0);
        assert_eq!(response.total_entries, 1);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[test]
    fn test_from_config_with_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            store_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };

        let state = AppState::from_config(&config).unwrap();
        state.cache.set("k", "v".to_string(), None).unwrap();
        assert!(dir.path().join("default.region").exists());
    }
}
