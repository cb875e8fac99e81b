//! K-anonymized aggregate rows.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tally_types::{Address, AgeBucket, Region};

/// Row key: one survey's aggregation scope, one (region, country) cell.
///
/// `None` region/country is the cell for persons who have not yet
/// submitted a country proof; they move to a concrete cell when one
/// arrives. Without this cell the row totals could not equal the number
/// of distinct pseudonyms ever seen.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AggregateKey {
    pub survey: Address,
    pub region: Option<Region>,
    pub country: Option<String>,
}

/// Cumulative demographic counters for one row.
///
/// Invariant: `count` equals the number of distinct nullifiers whose
/// current region/country match this row's key; summed over all rows of
/// all surveys, it equals the number of distinct nullifiers ever seen.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub survey: Address,
    pub region: Option<Region>,
    pub country: Option<String>,
    pub count: u64,
    pub verified_count: u64,
    #[serde(default)]
    pub age_buckets: BTreeMap<AgeBucket, u64>,
}

impl AggregateRow {
    pub fn new(key: &AggregateKey) -> Self {
        Self {
            survey: key.survey.clone(),
            region: key.region,
            country: key.country.clone(),
            count: 0,
            verified_count: 0,
            age_buckets: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> AggregateKey {
        AggregateKey {
            survey: self.survey.clone(),
            region: self.region,
            country: self.country.clone(),
        }
    }
}

/// Trait for aggregate row storage.
pub trait AggregateStore {
    fn get_row(&self, key: &AggregateKey) -> Result<Option<AggregateRow>, StoreError>;
    fn put_row(&self, row: &AggregateRow) -> Result<(), StoreError>;
    /// All rows for one survey, in key order.
    fn rows_for_survey(&self, survey: &Address) -> Result<Vec<AggregateRow>, StoreError>;
    /// Sum of `count` across every row of every survey.
    fn total_count(&self) -> Result<u64, StoreError>;
}
