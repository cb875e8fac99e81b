//! Applied-delta records.
//!
//! A submission that changes state produces a delta describing exactly
//! which aggregate cells moved. Subscribers receive this record, never
//! the full aggregate; a reconnecting client re-fetches the snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tally_types::{Address, AgeBucket, Region};

/// Change to a single aggregate row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowDelta {
    pub region: Option<Region>,
    pub country: Option<String>,
    pub count: i64,
    pub verified: i64,
    #[serde(default)]
    pub buckets: BTreeMap<AgeBucket, i64>,
}

impl RowDelta {
    pub fn new(region: Option<Region>, country: Option<String>) -> Self {
        Self {
            region,
            country,
            count: 0,
            verified: 0,
            buckets: BTreeMap::new(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.count == 0 && self.verified == 0 && self.buckets.values().all(|&v| v == 0)
    }
}

/// The full delta applied by one submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppliedDelta {
    pub survey: Address,
    /// Whether this submission created the person.
    pub new_person: bool,
    pub rows: Vec<RowDelta>,
}

impl AppliedDelta {
    pub fn is_zero(&self) -> bool {
        !self.new_person && self.rows.iter().all(RowDelta::is_zero)
    }
}
