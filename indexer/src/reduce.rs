//! The state reducer — folds the decoded event stream into the entity
//! store.
//!
//! Scalar fields use keyed overwrite semantics; accumulators
//! (`prize_funded`, `prize_swept`, vote balances) only ever add, gated by
//! persisted idempotence marks. The fold is therefore safe to apply to
//! the same event twice: the scanner's cursor discipline is the primary
//! reprocessing guard, the marks are the reducer's own.

use crate::IndexError;
use tally_events::{DomainEvent, EventKind};
use tally_store::{
    AppliedMarkStore, BalanceStore, SurveyRecord, SurveyStore, VoteMarkStore,
};
use tracing::{debug, warn};

/// Fold one event into the store.
pub fn reduce<S>(store: &S, event: &DomainEvent) -> Result<(), IndexError>
where
    S: SurveyStore + BalanceStore + VoteMarkStore + AppliedMarkStore,
{
    match &event.kind {
        EventKind::SurveyDeployed {
            survey,
            creator,
            start_time,
            end_time,
            survey_type,
            meta_hash,
            planned_reward,
            initial_value,
        } => {
            let mut record = match store.get_survey(survey)? {
                Some(existing) => existing,
                None => SurveyRecord::new(
                    survey.clone(),
                    creator.clone(),
                    *start_time,
                    *end_time,
                    *survey_type,
                    *meta_hash,
                ),
            };
            // Keyed overwrite for the deploy-time scalars; accumulators and
            // enrichment fields are untouched by a replayed deploy.
            record.creator = creator.clone();
            record.start_time = *start_time;
            record.end_time = *end_time;
            record.survey_type = *survey_type;
            record.meta_hash = *meta_hash;
            if let Some(reward) = planned_reward {
                record.planned_reward = *reward;
            }
            if let Some(value) = initial_value {
                record.initial_value = *value;
            }
            store.put_survey(&record)?;
        }

        EventKind::QuestionAdded { index, text } => {
            let Some(mut record) = store.get_survey(&event.address)? else {
                warn!(address = %event.address, "question for unknown survey, skipping");
                return Ok(());
            };
            record.questions.insert(*index, text.clone());
            store.put_survey(&record)?;
        }

        EventKind::Voted { voter } => {
            let survey = &event.address;
            if !store.contains_survey(survey)? {
                warn!(address = %survey, "vote for unknown survey, skipping");
                return Ok(());
            }
            if store.vote_marked(survey, voter)? {
                debug!(survey = %survey, voter = %voter, "vote already counted");
                return Ok(());
            }
            store.mark_vote(survey, voter)?;
            let count = store.balance(voter)?;
            store.set_balance(voter, count + 1)?;
        }

        EventKind::Finalized {
            rules_hash,
            results_hash,
            claim_open_at,
            claim_deadline,
        } => {
            let Some(mut record) = store.get_survey(&event.address)? else {
                warn!(address = %event.address, "finalize for unknown survey, skipping");
                return Ok(());
            };
            record.rules_hash = Some(*rules_hash);
            record.results_hash = Some(*results_hash);
            record.finalized_at = Some(event.timestamp);
            if claim_open_at.is_some() {
                record.claim_open_at = *claim_open_at;
            }
            if claim_deadline.is_some() {
                record.claim_deadline = *claim_deadline;
            }
            store.put_survey(&record)?;
        }

        EventKind::PrizeFunded { amount, .. } => {
            let Some(mut record) = store.get_survey(&event.address)? else {
                warn!(address = %event.address, "funding for unknown survey, skipping");
                return Ok(());
            };
            if store.event_applied(&event.tx_hash, event.log_index)? {
                debug!(tx = %event.tx_hash, "funding event already applied");
                return Ok(());
            }
            store.mark_event_applied(&event.tx_hash, event.log_index)?;
            record.add_funded(*amount);
            store.put_survey(&record)?;
        }

        EventKind::PrizeSwept { amount, .. } => {
            let Some(mut record) = store.get_survey(&event.address)? else {
                warn!(address = %event.address, "sweep for unknown survey, skipping");
                return Ok(());
            };
            if store.event_applied(&event.tx_hash, event.log_index)? {
                debug!(tx = %event.tx_hash, "sweep event already applied");
                return Ok(());
            }
            store.mark_event_applied(&event.tx_hash, event.log_index)?;
            record.add_swept(*amount);
            store.put_survey(&record)?;
        }

        EventKind::TreasuryFunded { funding_tx, .. } => {
            let Some(mut record) = store.get_survey(&event.address)? else {
                warn!(address = %event.address, "treasury funding for unknown survey, skipping");
                return Ok(());
            };
            // Idempotent: once funded, further applications are no-ops.
            if record.funded {
                return Ok(());
            }
            record.funded = true;
            record.funding_tx = Some(*funding_tx);
            store.put_survey(&record)?;
        }

        EventKind::BackfilledSchedule {
            start_time,
            end_time,
        } => {
            let Some(mut record) = store.get_survey(&event.address)? else {
                warn!(address = %event.address, "backfill for unknown survey, skipping");
                return Ok(());
            };
            if record.start_time.is_zero() && record.end_time.is_zero() {
                record.start_time = *start_time;
                record.end_time = *end_time;
                store.put_survey(&record)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_store::MemoryStore;
    use tally_types::{Address, ContentHash, Timestamp, TokenAmount, TxHash};

    fn addr(byte: u8) -> Address {
        Address::from_bytes(&[byte; 20])
    }

    fn event(address: Address, block: u64, index: u64, kind: EventKind) -> DomainEvent {
        DomainEvent {
            address,
            block_number: block,
            log_index: index,
            timestamp: Timestamp::new(block * 10),
            tx_hash: TxHash::new([block as u8; 32]),
            kind,
        }
    }

    fn deploy(survey: Address, block: u64) -> DomainEvent {
        event(
            addr(0xfa),
            block,
            0,
            EventKind::SurveyDeployed {
                survey,
                creator: addr(0xcc),
                start_time: Timestamp::new(100),
                end_time: Timestamp::new(200),
                survey_type: 1,
                meta_hash: ContentHash::new([0xaa; 32]),
                planned_reward: Some(TokenAmount::new(1000)),
                initial_value: None,
            },
        )
    }

    #[test]
    fn deploy_creates_record() {
        let store = MemoryStore::new();
        reduce(&store, &deploy(addr(1), 5)).unwrap();

        let record = store.get_survey(&addr(1)).unwrap().unwrap();
        assert_eq!(record.creator, addr(0xcc));
        assert_eq!(record.planned_reward.raw(), 1000);
        assert_eq!(record.start_time.as_secs(), 100);
    }

    #[test]
    fn replayed_deploy_keeps_accumulators() {
        let store = MemoryStore::new();
        reduce(&store, &deploy(addr(1), 5)).unwrap();

        let funded = event(
            addr(1),
            6,
            0,
            EventKind::PrizeFunded {
                funder: addr(0xcc),
                amount: TokenAmount::new(500),
            },
        );
        reduce(&store, &funded).unwrap();
        reduce(&store, &deploy(addr(1), 5)).unwrap();

        let record = store.get_survey(&addr(1)).unwrap().unwrap();
        assert_eq!(record.prize_funded.raw(), 500);
    }

    #[test]
    fn votes_count_once_per_survey_voter_pair() {
        let store = MemoryStore::new();
        reduce(&store, &deploy(addr(1), 1)).unwrap();
        reduce(&store, &deploy(addr(2), 2)).unwrap();

        let voter = addr(0x77);
        let vote = |survey: Address, block: u64| {
            event(survey, block, 0, EventKind::Voted { voter: voter.clone() })
        };

        reduce(&store, &vote(addr(1), 3)).unwrap();
        reduce(&store, &vote(addr(1), 3)).unwrap(); // replay
        reduce(&store, &vote(addr(2), 4)).unwrap(); // different survey

        // Cross-survey counter: one per distinct (survey, voter).
        assert_eq!(store.balance(&voter).unwrap(), 2);
    }

    #[test]
    fn funded_accumulator_is_exact_and_replay_safe() {
        let store = MemoryStore::new();
        reduce(&store, &deploy(addr(1), 1)).unwrap();

        let amounts = [100u128, 250, 7];
        for (i, raw) in amounts.iter().enumerate() {
            let mut e = event(
                addr(1),
                10 + i as u64,
                i as u64,
                EventKind::PrizeFunded {
                    funder: addr(0xcc),
                    amount: TokenAmount::new(*raw),
                },
            );
            e.tx_hash = TxHash::new([i as u8 + 1; 32]);
            reduce(&store, &e).unwrap();
            reduce(&store, &e).unwrap(); // replay every event
        }

        let record = store.get_survey(&addr(1)).unwrap().unwrap();
        assert_eq!(record.prize_funded.raw(), 357);
    }

    #[test]
    fn finalize_sets_hashes_and_timestamp() {
        let store = MemoryStore::new();
        reduce(&store, &deploy(addr(1), 1)).unwrap();

        let finalize = event(
            addr(1),
            30,
            0,
            EventKind::Finalized {
                rules_hash: ContentHash::new([1; 32]),
                results_hash: ContentHash::new([2; 32]),
                claim_open_at: Some(Timestamp::new(310)),
                claim_deadline: Some(Timestamp::new(400)),
            },
        );
        reduce(&store, &finalize).unwrap();

        let record = store.get_survey(&addr(1)).unwrap().unwrap();
        assert_eq!(record.finalized_at, Some(Timestamp::new(300)));
        assert_eq!(record.claim_deadline, Some(Timestamp::new(400)));
    }

    #[test]
    fn treasury_funding_is_set_once() {
        let store = MemoryStore::new();
        reduce(&store, &deploy(addr(1), 1)).unwrap();

        let fund = |tx_byte: u8| {
            event(
                addr(1),
                40,
                0,
                EventKind::TreasuryFunded {
                    funder: addr(0xcc),
                    amount: TokenAmount::new(1000),
                    funding_tx: TxHash::new([tx_byte; 32]),
                },
            )
        };
        reduce(&store, &fund(0x10)).unwrap();
        reduce(&store, &fund(0x20)).unwrap(); // later claim must not overwrite

        let record = store.get_survey(&addr(1)).unwrap().unwrap();
        assert!(record.funded);
        assert_eq!(record.funding_tx, Some(TxHash::new([0x10; 32])));
    }

    #[test]
    fn backfill_only_fills_missing_schedule() {
        let store = MemoryStore::new();
        let mut legacy = deploy(addr(1), 1);
        if let EventKind::SurveyDeployed {
            start_time,
            end_time,
            ..
        } = &mut legacy.kind
        {
            *start_time = Timestamp::EPOCH;
            *end_time = Timestamp::EPOCH;
        }
        reduce(&store, &legacy).unwrap();

        let backfill = event(
            addr(1),
            2,
            0,
            EventKind::BackfilledSchedule {
                start_time: Timestamp::new(500),
                end_time: Timestamp::new(600),
            },
        );
        reduce(&store, &backfill).unwrap();
        let record = store.get_survey(&addr(1)).unwrap().unwrap();
        assert_eq!(record.start_time.as_secs(), 500);

        // A second backfill with different values is a no-op.
        let second = event(
            addr(1),
            3,
            0,
            EventKind::BackfilledSchedule {
                start_time: Timestamp::new(900),
                end_time: Timestamp::new(999),
            },
        );
        reduce(&store, &second).unwrap();
        let record = store.get_survey(&addr(1)).unwrap().unwrap();
        assert_eq!(record.start_time.as_secs(), 500);
    }

    #[test]
    fn events_for_unknown_surveys_are_skipped() {
        let store = MemoryStore::new();
        let vote = event(addr(9), 1, 0, EventKind::Voted { voter: addr(0x77) });
        reduce(&store, &vote).unwrap();
        assert_eq!(store.balance(&addr(0x77)).unwrap(), 0);
    }
}
