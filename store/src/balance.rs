//! Per-voter vote balance storage.

use crate::StoreError;
use tally_types::Address;

/// One non-negative counter per voter address, incremented exactly once
/// per distinct `(survey, voter)` vote observed.
///
/// The counter is deliberately cross-survey (see DESIGN.md); the
/// exactly-once discipline lives in [`crate::VoteMarkStore`].
pub trait BalanceStore {
    fn balance(&self, voter: &Address) -> Result<u64, StoreError>;
    fn set_balance(&self, voter: &Address, count: u64) -> Result<(), StoreError>;
    fn iter_balances(&self) -> Result<Vec<(Address, u64)>, StoreError>;
}
