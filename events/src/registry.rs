//! Schema registry — ordered candidate decoders per emitting family.
//!
//! The factory family covers "instance deployed" events in their three
//! historical shapes; the instance family covers survey-level events.
//! Candidates are tried in priority order (current shape first, legacy
//! last); the first success wins and any fallback is logged rather than
//! guessed silently.

use crate::codec::WordReader;
use crate::{DecodeError, DomainEvent, EventKind};

use tally_chain::LogEntry;
use tally_crypto::event_topic;
use tally_types::Timestamp;
use tracing::{debug, warn};

/// Event signature strings. Topic identifiers are derived from these via
/// [`event_topic`]; log producers and tests use the same constants.
pub mod sig {
    pub const SURVEY_DEPLOYED_V2: &str =
        "SurveyDeployed(address,address,uint64,uint64,uint8,bytes32,uint128,uint128)";
    pub const SURVEY_DEPLOYED_V1: &str =
        "SurveyDeployed(address,address,uint64,uint64,uint8,bytes32)";
    /// Legacy factory shape: no schedule fields at all.
    pub const SURVEY_CREATED_LEGACY: &str = "SurveyCreated(address,address,uint8,bytes32)";

    pub const QUESTION_ADDED: &str = "QuestionAdded(uint64,string)";
    pub const VOTED: &str = "Voted(address)";
    pub const FINALIZED_V2: &str = "Finalized(bytes32,bytes32,uint64,uint64)";
    pub const FINALIZED_V1: &str = "Finalized(bytes32,bytes32)";
    pub const PRIZE_FUNDED: &str = "PrizeFunded(address,uint128)";
    pub const PRIZE_SWEPT: &str = "PrizeSwept(address,uint128)";
}

struct Candidate {
    name: &'static str,
    topic: [u8; 32],
    decode: fn(&LogEntry) -> Result<EventKind, DecodeError>,
}

/// Registry of candidate decoders for both event families.
pub struct SchemaRegistry {
    factory: Vec<Candidate>,
    instance: Vec<Candidate>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        let factory = vec![
            Candidate {
                name: "SurveyDeployed/v2",
                topic: event_topic(sig::SURVEY_DEPLOYED_V2),
                decode: decode_survey_deployed_v2,
            },
            Candidate {
                name: "SurveyDeployed/v1",
                topic: event_topic(sig::SURVEY_DEPLOYED_V1),
                decode: decode_survey_deployed_v1,
            },
            Candidate {
                name: "SurveyCreated/legacy",
                topic: event_topic(sig::SURVEY_CREATED_LEGACY),
                decode: decode_survey_created_legacy,
            },
        ];
        let instance = vec![
            Candidate {
                name: "QuestionAdded",
                topic: event_topic(sig::QUESTION_ADDED),
                decode: decode_question_added,
            },
            Candidate {
                name: "Voted",
                topic: event_topic(sig::VOTED),
                decode: decode_voted,
            },
            Candidate {
                name: "Finalized/v2",
                topic: event_topic(sig::FINALIZED_V2),
                decode: decode_finalized_v2,
            },
            Candidate {
                name: "Finalized/v1",
                topic: event_topic(sig::FINALIZED_V1),
                decode: decode_finalized_v1,
            },
            Candidate {
                name: "PrizeFunded",
                topic: event_topic(sig::PRIZE_FUNDED),
                decode: decode_prize_funded,
            },
            Candidate {
                name: "PrizeSwept",
                topic: event_topic(sig::PRIZE_SWEPT),
                decode: decode_prize_swept,
            },
        ];
        Self { factory, instance }
    }

    /// Decode a log from the factory/registry address.
    pub fn decode_factory(
        &self,
        log: &LogEntry,
        timestamp: Timestamp,
    ) -> Result<DomainEvent, DecodeError> {
        decode_with(&self.factory, log, timestamp)
    }

    /// Decode a log from a survey instance address.
    pub fn decode_instance(
        &self,
        log: &LogEntry,
        timestamp: Timestamp,
    ) -> Result<DomainEvent, DecodeError> {
        decode_with(&self.instance, log, timestamp)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_with(
    candidates: &[Candidate],
    log: &LogEntry,
    timestamp: Timestamp,
) -> Result<DomainEvent, DecodeError> {
    let topic = log.topic0().ok_or(DecodeError::NoTopics)?;

    let mut last_err = DecodeError::UnknownTopic;
    for (priority, candidate) in candidates.iter().enumerate() {
        if &candidate.topic != topic {
            continue;
        }
        match (candidate.decode)(log) {
            Ok(kind) => {
                if priority > 0 {
                    debug!(
                        schema = candidate.name,
                        address = %log.address,
                        block = log.block_number,
                        "decoded via fallback schema variant"
                    );
                }
                return Ok(DomainEvent {
                    address: log.address.clone(),
                    block_number: log.block_number,
                    log_index: log.log_index,
                    timestamp,
                    tx_hash: log.transaction_hash,
                    kind,
                });
            }
            Err(e) => {
                warn!(
                    schema = candidate.name,
                    block = log.block_number,
                    error = %e,
                    "candidate schema matched topic but payload did not decode"
                );
                last_err = e;
            }
        }
    }
    Err(last_err)
}

// ── Candidate decoders ────────────────────────────────────────────────

fn decode_survey_deployed_v2(log: &LogEntry) -> Result<EventKind, DecodeError> {
    let mut r = WordReader::new(&log.data);
    Ok(EventKind::SurveyDeployed {
        survey: r.address()?,
        creator: r.address()?,
        start_time: r.timestamp()?,
        end_time: r.timestamp()?,
        survey_type: r.u8()?,
        meta_hash: r.hash()?,
        planned_reward: Some(r.amount()?),
        initial_value: Some(r.amount()?),
    })
}

fn decode_survey_deployed_v1(log: &LogEntry) -> Result<EventKind, DecodeError> {
    let mut r = WordReader::new(&log.data);
    Ok(EventKind::SurveyDeployed {
        survey: r.address()?,
        creator: r.address()?,
        start_time: r.timestamp()?,
        end_time: r.timestamp()?,
        survey_type: r.u8()?,
        meta_hash: r.hash()?,
        planned_reward: None,
        initial_value: None,
    })
}

fn decode_survey_created_legacy(log: &LogEntry) -> Result<EventKind, DecodeError> {
    let mut r = WordReader::new(&log.data);
    Ok(EventKind::SurveyDeployed {
        survey: r.address()?,
        creator: r.address()?,
        // No schedule in the legacy shape; the metadata join backfills it.
        start_time: Timestamp::EPOCH,
        end_time: Timestamp::EPOCH,
        survey_type: r.u8()?,
        meta_hash: r.hash()?,
        planned_reward: None,
        initial_value: None,
    })
}

fn decode_question_added(log: &LogEntry) -> Result<EventKind, DecodeError> {
    let mut r = WordReader::new(&log.data);
    Ok(EventKind::QuestionAdded {
        index: r.u64()?,
        text: r.string()?,
    })
}

fn decode_voted(log: &LogEntry) -> Result<EventKind, DecodeError> {
    let mut r = WordReader::new(&log.data);
    Ok(EventKind::Voted { voter: r.address()? })
}

fn decode_finalized_v2(log: &LogEntry) -> Result<EventKind, DecodeError> {
    let mut r = WordReader::new(&log.data);
    Ok(EventKind::Finalized {
        rules_hash: r.hash()?,
        results_hash: r.hash()?,
        claim_open_at: Some(r.timestamp()?),
        claim_deadline: Some(r.timestamp()?),
    })
}

fn decode_finalized_v1(log: &LogEntry) -> Result<EventKind, DecodeError> {
    let mut r = WordReader::new(&log.data);
    Ok(EventKind::Finalized {
        rules_hash: r.hash()?,
        results_hash: r.hash()?,
        claim_open_at: None,
        claim_deadline: None,
    })
}

fn decode_prize_funded(log: &LogEntry) -> Result<EventKind, DecodeError> {
    let mut r = WordReader::new(&log.data);
    Ok(EventKind::PrizeFunded {
        funder: r.address()?,
        amount: r.amount()?,
    })
}

fn decode_prize_swept(log: &LogEntry) -> Result<EventKind, DecodeError> {
    let mut r = WordReader::new(&log.data);
    Ok(EventKind::PrizeSwept {
        to: r.address()?,
        amount: r.amount()?,
    })
}
