//! The decoded domain event stream.

use serde::{Deserialize, Serialize};
use tally_types::{Address, ContentHash, Timestamp, TokenAmount, TxHash};

/// A decoded event, immutable once produced.
///
/// Stream order is defined by `(block_number, log_index)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Emitting contract address.
    pub address: Address,
    pub block_number: u64,
    pub log_index: u64,
    /// Block timestamp, normalized to seconds.
    pub timestamp: Timestamp,
    pub tx_hash: TxHash,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl DomainEvent {
    /// The stream ordering key.
    pub fn ordering_key(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

/// Kind-specific payloads.
///
/// The first six variants decode from on-chain logs. `TreasuryFunded` is
/// synthesized by funding verification and `BackfilledSchedule` by the
/// metadata join; both flow through the same reducer and event ledger as
/// decoded events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    SurveyDeployed {
        survey: Address,
        creator: Address,
        start_time: Timestamp,
        end_time: Timestamp,
        survey_type: u8,
        meta_hash: ContentHash,
        planned_reward: Option<TokenAmount>,
        initial_value: Option<TokenAmount>,
    },
    QuestionAdded {
        index: u64,
        text: String,
    },
    Voted {
        voter: Address,
    },
    Finalized {
        rules_hash: ContentHash,
        results_hash: ContentHash,
        claim_open_at: Option<Timestamp>,
        claim_deadline: Option<Timestamp>,
    },
    PrizeFunded {
        funder: Address,
        amount: TokenAmount,
    },
    PrizeSwept {
        to: Address,
        amount: TokenAmount,
    },
    TreasuryFunded {
        funder: Address,
        amount: TokenAmount,
        funding_tx: TxHash,
    },
    BackfilledSchedule {
        start_time: Timestamp,
        end_time: Timestamp,
    },
}

impl EventKind {
    /// Short label used in logs and the event ledger.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SurveyDeployed { .. } => "survey_deployed",
            Self::QuestionAdded { .. } => "question_added",
            Self::Voted { .. } => "voted",
            Self::Finalized { .. } => "finalized",
            Self::PrizeFunded { .. } => "prize_funded",
            Self::PrizeSwept { .. } => "prize_swept",
            Self::TreasuryFunded { .. } => "treasury_funded",
            Self::BackfilledSchedule { .. } => "backfilled_schedule",
        }
    }
}
