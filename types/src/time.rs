//! Timestamp type and the milliseconds/seconds normalization rule.
//!
//! Upstream sources report timestamps inconsistently: block timestamps are
//! seconds, some metadata documents and event fields carry milliseconds.
//! Every timestamp-bearing field passes through [`Timestamp::normalize`]
//! exactly once, at the decode/ingest boundary, before being stored or
//! compared.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Raw values above this magnitude are treated as milliseconds.
/// 10^12 seconds is year ~33658; 10^12 milliseconds is September 2001.
const MILLIS_THRESHOLD: u64 = 1_000_000_000_000;

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const EPOCH: Self = Self(0);

    /// Wrap a value already known to be seconds.
    pub const fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Normalize a raw value that may be seconds or milliseconds.
    ///
    /// Must be applied exactly once per field per write; applying it to an
    /// already-normalized value is harmless only because plausible
    /// second-scale values sit far below the threshold.
    pub fn normalize(raw: u64) -> Self {
        if raw > MILLIS_THRESHOLD {
            Self(raw / 1000)
        } else {
            Self(raw)
        }
    }

    /// Get the current system time as a `Timestamp`.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_secs();
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
