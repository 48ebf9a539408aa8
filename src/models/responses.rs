//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, Status};

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value, absent when expired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// `success` or `expired`
    pub status: Status,
}

impl GetResponse {
    pub fn hit(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            status: Status::Success,
        }
    }

    pub fn expired(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            status: Status::Expired,
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
    pub status: Status,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
            status: Status::Success,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
///
/// `deleted` is false both for unknown keys and when the region was busy.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// The key that was targeted
    pub key: String,
    /// Whether a value was removed
    pub deleted: bool,
    /// The removed value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>, removed: Option<String>) -> Self {
        Self {
            key: key.into(),
            deleted: removed.is_some(),
            value: removed,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses (expired or never set)
    pub misses: u64,
    /// Number of evictions
    pub evictions: u64,
    /// Number of writes refused because the region was locked
    pub contentions: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            contentions: stats.contentions,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Always `failure`
    pub status: Status,
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            status: Status::Failure,
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_response_hit_serialize() {
        let resp = GetResponse::hit("test_key", "test_value");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["key"], "test_key");
        assert_eq!(json["value"], "test_value");
        assert_eq!(json["status"], "success");
    }

    #[test]
    fn test_get_response_expired_omits_value() {
        let resp = GetResponse::expired("gone");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "expired");
        assert!(json.get("value").is_none());
    }

    #[test]
    fn test_set_response_serialize() {
        let resp = SetResponse::new("my_key");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("my_key"));
        assert!(json.contains("successfully"));
    }

    #[test]
    fn test_delete_response() {
        let resp = DeleteResponse::new("k", Some("v".to_string()));
        assert!(resp.deleted);
        let resp = DeleteResponse::new("k", None);
        assert!(!resp.deleted);
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("value").is_none());
    }

    #[test]
    fn test_stats_response_from_stats() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            evictions: 5,
            contentions: 1,
            total_entries: 100,
        };
        let resp = StatsResponse::from(stats);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.contentions, 1);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["error"], "Something went wrong");
        assert_eq!(json["status"], "failure");
    }
}
