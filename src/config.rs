//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::cache::{CacheConfig, Timeout};
use crate::error::{CacheError, Result};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Region name the cache registry is stored under
    pub cache_name: String,
    /// Timeout descriptor applied to writes without an explicit timeout
    pub default_expiry: String,
    /// Key ceiling, 0 disables eviction
    pub max_keys: usize,
    /// Byte ceiling (accepted, not enforced)
    pub max_size: Option<u64>,
    /// Directory for the file-backed store; in-memory store when unset
    pub store_dir: Option<PathBuf>,
    /// HTTP server port
    pub server_port: u16,
    /// Background purge interval in seconds, 0 disables the task
    pub purge_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_NAME` - Cache region name (default: "default")
    /// - `DEFAULT_EXPIRY` - Timeout descriptor (default: "never")
    /// - `MAX_KEYS` - Key ceiling, 0 disables eviction (default: 1000)
    /// - `MAX_SIZE` - Byte ceiling, not enforced (default: unset)
    /// - `STORE_DIR` - File store directory (default: unset, in-memory)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `PURGE_INTERVAL` - Purge frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_name: env::var("CACHE_NAME")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.cache_name),
            default_expiry: env::var("DEFAULT_EXPIRY").unwrap_or(defaults.default_expiry),
            max_keys: env::var("MAX_KEYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_keys),
            max_size: env::var("MAX_SIZE").ok().and_then(|v| v.parse().ok()),
            store_dir: env::var_os("STORE_DIR").map(PathBuf::from),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            purge_interval: env::var("PURGE_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.purge_interval),
        }
    }

    /// Builds the cache configuration, failing on a malformed `default_expiry`.
    pub fn cache_config(&self) -> Result<CacheConfig> {
        let default_expiry: Timeout = self.default_expiry.parse().map_err(|_| {
            CacheError::InvalidConfig(format!(
                "DEFAULT_EXPIRY '{}' is not a valid timeout",
                self.default_expiry
            ))
        })?;

        let mut config = CacheConfig::new(self.cache_name.clone()).with_default_expiry(default_expiry);
        if self.max_keys > 0 {
            config = config.with_max_keys(self.max_keys);
        }
        if let Some(max_size) = self.max_size {
            config = config.with_max_size(max_size);
        }
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_name: "default".to_string(),
            default_expiry: "never".to_string(),
            max_keys: 1000,
            max_size: None,
            store_dir: None,
            server_port: 3000,
            purge_interval: 60,
        }
    }
}
