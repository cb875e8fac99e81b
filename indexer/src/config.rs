//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use tally_types::Address;

/// Configuration for the checkpointed scanner and enrichment stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Factory/registry contract emitting "instance deployed" events.
    pub factory: Address,
    /// Treasury address funding transactions must pay into.
    pub treasury: Address,

    /// Never scan below this height (contract deployment height).
    #[serde(default)]
    pub start_floor: u64,

    /// When nonzero, never scan more than this many blocks behind the
    /// tip; bounds a cold start against an old cursor.
    #[serde(default)]
    pub tail_window: u64,

    /// Blocks per range query.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Minimum confirmation depth for funding verification.
    #[serde(default = "default_min_confirmations")]
    pub min_confirmations: u64,

    /// Attempts for a failing ledger query before giving up on it.
    #[serde(default = "default_query_attempts")]
    pub query_attempts: u32,

    /// Base backoff between retries, in milliseconds (doubled per retry).
    #[serde(default = "default_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_batch_size() -> u64 {
    500
}

fn default_min_confirmations() -> u64 {
    6
}

fn default_query_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    250
}

impl ScanConfig {
    /// A config with defaults for everything but the two required addresses.
    pub fn new(factory: Address, treasury: Address) -> Self {
        Self {
            factory,
            treasury,
            start_floor: 0,
            tail_window: 0,
            batch_size: default_batch_size(),
            min_confirmations: default_min_confirmations(),
            query_attempts: default_query_attempts(),
            retry_backoff_ms: default_backoff_ms(),
        }
    }

    /// Effective scan start for a given cursor and tip.
    pub fn effective_start(&self, cursor: Option<u64>, latest: u64) -> u64 {
        let from_cursor = cursor.map(|c| c + 1).unwrap_or(0);
        let tail_floor = if self.tail_window > 0 {
            latest.saturating_sub(self.tail_window)
        } else {
            0
        };
        from_cursor.max(self.start_floor).max(tail_floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(floor: u64, tail: u64) -> ScanConfig {
        let mut c = ScanConfig::new(
            Address::from_bytes(&[1; 20]),
            Address::from_bytes(&[2; 20]),
        );
        c.start_floor = floor;
        c.tail_window = tail;
        c
    }

    #[test]
    fn start_is_cursor_plus_one() {
        assert_eq!(config(0, 0).effective_start(Some(10), 100), 11);
    }

    #[test]
    fn floor_wins_over_stale_cursor() {
        assert_eq!(config(50, 0).effective_start(Some(10), 100), 50);
    }

    #[test]
    fn tail_window_bounds_cold_start() {
        assert_eq!(config(0, 20).effective_start(None, 100), 80);
    }

    #[test]
    fn no_cursor_no_floor_starts_at_zero() {
        assert_eq!(config(0, 0).effective_start(None, 100), 0);
    }
}
