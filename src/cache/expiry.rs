//! Expiry Module
//!
//! Timeout descriptors as callers supply them, and the resolved expiry stored
//! next to every registry entry.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

// == Expiry ==
/// Resolved expiration of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expiry {
    /// Entry never expires
    Never,
    /// Entry is expired from the moment it is written
    Now,
    /// Absolute expiration instant (Unix milliseconds)
    At(u64),
}

impl Expiry {
    /// Checks if the expiry has elapsed at `now_ms`.
    ///
    /// Boundary condition: an instant equal to `now_ms` counts as expired.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::Now => true,
            Expiry::At(at) => *at <= now_ms,
        }
    }
}

// == Timeout ==
/// Expiration request attached to a `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeout {
    #[default]
    Never,
    Now,
    /// Relative to the moment the entry is written
    After(Duration),
    /// Absolute wall-clock instant
    At(DateTime<Utc>),
}

impl Timeout {
    /// Resolves the request against `now_ms` into a stored [`Expiry`].
    ///
    /// Instants before the Unix epoch resolve to an already elapsed expiry.
    pub fn resolve(&self, now_ms: u64) -> Expiry {
        match self {
            Timeout::Never => Expiry::Never,
            Timeout::Now => Expiry::Now,
            Timeout::After(duration) => {
                let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                Expiry::At(now_ms.saturating_add(millis))
            }
            Timeout::At(instant) => Expiry::At(u64::try_from(instant.timestamp_millis()).unwrap_or(0)),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Timeout::After(duration)
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeout::Never => write!(f, "never"),
            Timeout::Now => write!(f, "now"),
            Timeout::After(duration) => write!(f, "{}ms", duration.as_millis()),
            Timeout::At(instant) => write!(f, "{}", instant.to_rfc3339()),
        }
    }
}

// == Parsing ==
/// Parses a timeout descriptor.
///
/// Accepted forms: `never` (or `0`), `now`, an RFC 3339 timestamp, or an
/// integer with an optional `ms`, `s`, `m`, `h` or `d` suffix. A bare integer
/// counts seconds.
impl FromStr for Timeout {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let descriptor = s.trim().to_ascii_lowercase();
        let invalid = || CacheError::InvalidTimeout(s.to_string());

        match descriptor.as_str() {
            "" => return Err(invalid()),
            "never" | "0" => return Ok(Timeout::Never),
            "now" => return Ok(Timeout::Now),
            _ => {}
        }

        if let Ok(instant) = DateTime::parse_from_rfc3339(s.trim()) {
            return Ok(Timeout::At(instant.with_timezone(&Utc)));
        }

        let split = descriptor
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(descriptor.len());
        let (digits, unit) = descriptor.split_at(split);
        let amount: u64 = digits.parse().map_err(|_| invalid())?;

        let duration = match unit {
            "ms" => Duration::from_millis(amount),
            "" | "s" => Duration::from_secs(amount),
            "m" => Duration::from_secs(amount.checked_mul(60).ok_or_else(invalid)?),
            "h" => Duration::from_secs(amount.checked_mul(3_600).ok_or_else(invalid)?),
            "d" => Duration::from_secs(amount.checked_mul(86_400).ok_or_else(invalid)?),
            _ => return Err(invalid()),
        };

        Ok(Timeout::After(duration))
    }
}
