//! Operation status reported by every cache call.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of the most recent cache operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Success,
    /// The operation did not complete; an error description is available.
    Failure,
    /// The value is absent or past its expiration (`get` only).
    Expired,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Success => "success",
            Status::Failure => "failure",
            Status::Expired => "expired",
        };
        f.write_str(name)
    }
}
