//! Idempotence marks.
//!
//! Two small mark sets make the reducer safe to replay: one per distinct
//! `(survey, voter)` vote, one per applied amount-bearing event. Both are
//! persisted alongside the entity stores so a re-scan of an already
//! processed range cannot double-count.

use crate::StoreError;
use tally_types::{Address, TxHash};

/// Marks for votes already counted.
pub trait VoteMarkStore {
    fn vote_marked(&self, survey: &Address, voter: &Address) -> Result<bool, StoreError>;
    fn mark_vote(&self, survey: &Address, voter: &Address) -> Result<(), StoreError>;
}

/// Marks for amount-bearing events already folded into an accumulator.
pub trait AppliedMarkStore {
    fn event_applied(&self, tx: &TxHash, log_index: u64) -> Result<bool, StoreError>;
    fn mark_event_applied(&self, tx: &TxHash, log_index: u64) -> Result<(), StoreError>;
}
