//! Cache Module
//!
//! Expiring entries over a shared store region, bounded by a key ceiling.

mod clock;
mod eviction;
mod expiry;
mod registry;
mod shared;
mod stats;
mod status;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use eviction::{evict, eviction_target};
pub use expiry::{Expiry, Timeout};
pub use registry::{CacheRegistry, METADATA_KEY};
pub use shared::{CacheConfig, SharedCache};
pub use stats::CacheStats;
pub use status::Status;
