//! Survey record storage.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tally_types::{Address, ContentHash, SurveyStatus, Timestamp, TokenAmount, TxHash};

/// Everything known about one survey instance, keyed by its
/// case-normalized contract address.
///
/// Created on the first deploy sighting, mutated by every subsequent
/// matching event or enrichment pass, never deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurveyRecord {
    pub address: Address,
    pub creator: Address,
    /// Scheduled voting window (seconds). Zero until known for legacy
    /// deploys; the metadata join may backfill it.
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub survey_type: u8,
    /// On-chain content hash binding the off-chain metadata document.
    pub meta_hash: ContentHash,
    /// Questions by on-chain index.
    #[serde(default)]
    pub questions: BTreeMap<u64, String>,
    pub rules_hash: Option<ContentHash>,
    pub results_hash: Option<ContentHash>,
    pub finalized_at: Option<Timestamp>,
    pub claim_open_at: Option<Timestamp>,
    pub claim_deadline: Option<Timestamp>,
    /// Monotonic accumulator: total prize value ever funded.
    pub prize_funded: TokenAmount,
    /// Monotonic accumulator: total prize value ever swept out.
    pub prize_swept: TokenAmount,
    /// Live balance, overwritten on every refresh.
    pub balance: TokenAmount,
    /// Planned reward from the deploy event or the metadata document.
    pub planned_reward: TokenAmount,
    pub initial_value: TokenAmount,

    // Off-chain enrichment fields.
    pub title: String,
    pub summary: String,
    /// Reward in raw units and as a whole-token display string.
    pub reward: TokenAmount,
    pub reward_tokens: String,
    /// Whether the metadata document's hash matched `meta_hash`.
    pub meta_valid: bool,
    /// Eligibility gate contract, when the survey is gated.
    pub gate: Option<Address>,
    /// Eligibility predicate labels (e.g. "age", "country:DE").
    #[serde(default)]
    pub eligibility: Vec<String>,

    /// Set once by funding verification; later passes are no-ops.
    pub funded: bool,
    pub funding_tx: Option<TxHash>,
}

impl SurveyRecord {
    /// A fresh record from a deploy sighting.
    pub fn new(
        address: Address,
        creator: Address,
        start_time: Timestamp,
        end_time: Timestamp,
        survey_type: u8,
        meta_hash: ContentHash,
    ) -> Self {
        Self {
            address,
            creator,
            start_time,
            end_time,
            survey_type,
            meta_hash,
            questions: BTreeMap::new(),
            rules_hash: None,
            results_hash: None,
            finalized_at: None,
            claim_open_at: None,
            claim_deadline: None,
            prize_funded: TokenAmount::ZERO,
            prize_swept: TokenAmount::ZERO,
            balance: TokenAmount::ZERO,
            planned_reward: TokenAmount::ZERO,
            initial_value: TokenAmount::ZERO,
            title: String::new(),
            summary: String::new(),
            reward: TokenAmount::ZERO,
            reward_tokens: String::new(),
            meta_valid: false,
            gate: None,
            eligibility: Vec::new(),
            funded: false,
            funding_tx: None,
        }
    }

    /// Add to the funded accumulator. Saturates rather than wraps; the
    /// accumulator never decreases.
    pub fn add_funded(&mut self, amount: TokenAmount) {
        self.prize_funded = self.prize_funded.saturating_add(amount);
    }

    /// Add to the swept accumulator.
    pub fn add_swept(&mut self, amount: TokenAmount) {
        self.prize_swept = self.prize_swept.saturating_add(amount);
    }

    /// Computed lifecycle status.
    pub fn status(&self, now: Timestamp) -> SurveyStatus {
        SurveyStatus::compute(self.start_time, self.end_time, self.finalized_at, now)
    }
}

/// Trait for survey record storage.
pub trait SurveyStore {
    fn get_survey(&self, address: &Address) -> Result<Option<SurveyRecord>, StoreError>;
    fn put_survey(&self, record: &SurveyRecord) -> Result<(), StoreError>;
    fn contains_survey(&self, address: &Address) -> Result<bool, StoreError>;
    fn survey_addresses(&self) -> Result<Vec<Address>, StoreError>;
    fn iter_surveys(&self) -> Result<Vec<SurveyRecord>, StoreError>;

    fn survey_count(&self) -> Result<u64, StoreError> {
        self.iter_surveys().map(|v| v.len() as u64)
    }
}
