//! Pending off-chain funding claims.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use tally_types::{Address, Timestamp, TxHash};

/// A claim that `funding_tx` funded `survey` through the treasury,
/// awaiting on-chain verification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FundingClaim {
    pub survey: Address,
    pub funding_tx: TxHash,
    pub submitted_at: Timestamp,
}

/// Queue of claims written by the external submission tooling and
/// drained by the enrichment stage.
pub trait FundingQueueStore {
    fn pending_claims(&self) -> Result<Vec<FundingClaim>, StoreError>;
    fn push_claim(&self, claim: &FundingClaim) -> Result<(), StoreError>;
    /// Drop every pending claim for `survey` (verified or permanently rejected).
    fn resolve_claims(&self, survey: &Address) -> Result<(), StoreError>;
}
