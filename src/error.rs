//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::cache::Status;
use crate::models::ErrorResponse;

// == Store Error Enum ==
/// Failures raised by a shared store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The adapter does not implement the requested mode
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Any other adapter-specific failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

// == Cache Error Enum ==
/// Unified error type for cache operations.
///
/// Every variant surfaces to callers as [`Status::Failure`]; expiration is
/// not an error and is reported through [`Status::Expired`] instead.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is empty or otherwise unusable
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Key collides with the registry's reserved metadata key
    #[error("Key is reserved: {0}")]
    ReservedKey(String),

    /// Timeout descriptor could not be resolved to an expiry
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    /// Construction parameters are missing or malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Another holder owns the region lock
    #[error("Cache region '{0}' is locked by another writer")]
    Busy(String),

    /// The shared store failed to read or write the registry
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The stored registry does not have the expected shape
    #[error("Registry corrupted: {0}")]
    Corrupt(String),

    /// The registry could not be encoded for persistence
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CacheError {
    /// Caller-visible status for this error.
    pub fn status(&self) -> Status {
        Status::Failure
    }

    /// True when the error came from lock contention rather than bad input
    /// or a broken store.
    pub fn is_busy(&self) -> bool {
        matches!(self, CacheError::Busy(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidKey(_)
            | CacheError::ReservedKey(_)
            | CacheError::InvalidTimeout(_)
            | CacheError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            CacheError::Busy(_) => StatusCode::CONFLICT,
            CacheError::Store(_) | CacheError::Corrupt(_) | CacheError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
