//! Published snapshot shape.

use crate::{StoreError, SurveyRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tally_types::{Address, SigningDomain, SurveyStatus, Timestamp, TokenAmount};

/// One row of the derived flat list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SurveySummary {
    pub address: Address,
    pub creator: Address,
    pub title: String,
    pub status: SurveyStatus,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub reward: TokenAmount,
    pub funded: bool,
    pub meta_valid: bool,
}

impl SurveySummary {
    pub fn from_record(record: &SurveyRecord, now: Timestamp) -> Self {
        Self {
            address: record.address.clone(),
            creator: record.creator.clone(),
            title: record.title.clone(),
            status: record.status(now),
            start_time: record.start_time,
            end_time: record.end_time,
            reward: record.reward,
            funded: record.funded,
            meta_valid: record.meta_valid,
        }
    }
}

/// Pipeline progress descriptor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateDescriptor {
    pub last_height: u64,
    pub updated_at: Timestamp,
}

/// The full external representation of the entity store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// Keyed map, survey address → record.
    pub surveys: BTreeMap<Address, SurveyRecord>,
    /// Flat list with computed lifecycle status.
    pub list: Vec<SurveySummary>,
    /// Voter address → vote count.
    pub balances: BTreeMap<Address, u64>,
    pub state: StateDescriptor,
    pub signing_domain: SigningDomain,
}

/// Downstream publish target. Publishing must be atomic from the
/// consumer's point of view: partial writes are never observable.
pub trait SnapshotSink {
    fn publish(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}
