//! In-memory store — thread-safe implementation of every storage trait.
//!
//! Backs tests and the ingest service's hot path. Safe for use from
//! tokio's multi-threaded runtime; no lock is held across an await.

use crate::aggregate::{AggregateKey, AggregateRow, AggregateStore};
use crate::balance::BalanceStore;
use crate::cursor::CursorStore;
use crate::funding::{FundingClaim, FundingQueueStore};
use crate::ledger_log::EventLedger;
use crate::marks::{AppliedMarkStore, VoteMarkStore};
use crate::person::{Person, PersonStore};
use crate::snapshot::{Snapshot, SnapshotSink};
use crate::survey::{SurveyRecord, SurveyStore};
use crate::StoreError;

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use tally_types::{Address, Nullifier, TxHash};

#[derive(Default)]
pub struct MemoryStore {
    cursor: Mutex<Option<u64>>,
    surveys: Mutex<BTreeMap<Address, SurveyRecord>>,
    balances: Mutex<BTreeMap<Address, u64>>,
    vote_marks: Mutex<HashSet<(Address, Address)>>,
    applied_marks: Mutex<HashSet<(TxHash, u64)>>,
    persons: Mutex<BTreeMap<Nullifier, Person>>,
    aggregates: Mutex<BTreeMap<AggregateKey, AggregateRow>>,
    funding_queue: Mutex<Vec<FundingClaim>>,
    events: Mutex<Vec<serde_json::Value>>,
    published: Mutex<Option<Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last published snapshot, for assertions.
    pub fn published(&self) -> Option<Snapshot> {
        self.published.lock().unwrap().clone()
    }

    /// Appended event records, for assertions.
    pub fn event_records(&self) -> Vec<serde_json::Value> {
        self.events.lock().unwrap().clone()
    }
}

impl CursorStore for MemoryStore {
    fn cursor(&self) -> Result<Option<u64>, StoreError> {
        Ok(*self.cursor.lock().unwrap())
    }

    fn set_cursor(&self, height: u64) -> Result<(), StoreError> {
        *self.cursor.lock().unwrap() = Some(height);
        Ok(())
    }
}

impl SurveyStore for MemoryStore {
    fn get_survey(&self, address: &Address) -> Result<Option<SurveyRecord>, StoreError> {
        Ok(self.surveys.lock().unwrap().get(address).cloned())
    }

    fn put_survey(&self, record: &SurveyRecord) -> Result<(), StoreError> {
        self.surveys
            .lock()
            .unwrap()
            .insert(record.address.clone(), record.clone());
        Ok(())
    }

    fn contains_survey(&self, address: &Address) -> Result<bool, StoreError> {
        Ok(self.surveys.lock().unwrap().contains_key(address))
    }

    fn survey_addresses(&self) -> Result<Vec<Address>, StoreError> {
        Ok(self.surveys.lock().unwrap().keys().cloned().collect())
    }

    fn iter_surveys(&self) -> Result<Vec<SurveyRecord>, StoreError> {
        Ok(self.surveys.lock().unwrap().values().cloned().collect())
    }
}

impl BalanceStore for MemoryStore {
    fn balance(&self, voter: &Address) -> Result<u64, StoreError> {
        Ok(self.balances.lock().unwrap().get(voter).copied().unwrap_or(0))
    }

    fn set_balance(&self, voter: &Address, count: u64) -> Result<(), StoreError> {
        self.balances.lock().unwrap().insert(voter.clone(), count);
        Ok(())
    }

    fn iter_balances(&self) -> Result<Vec<(Address, u64)>, StoreError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect())
    }
}

impl VoteMarkStore for MemoryStore {
    fn vote_marked(&self, survey: &Address, voter: &Address) -> Result<bool, StoreError> {
        Ok(self
            .vote_marks
            .lock()
            .unwrap()
            .contains(&(survey.clone(), voter.clone())))
    }

    fn mark_vote(&self, survey: &Address, voter: &Address) -> Result<(), StoreError> {
        self.vote_marks
            .lock()
            .unwrap()
            .insert((survey.clone(), voter.clone()));
        Ok(())
    }
}

impl AppliedMarkStore for MemoryStore {
    fn event_applied(&self, tx: &TxHash, log_index: u64) -> Result<bool, StoreError> {
        Ok(self.applied_marks.lock().unwrap().contains(&(*tx, log_index)))
    }

    fn mark_event_applied(&self, tx: &TxHash, log_index: u64) -> Result<(), StoreError> {
        self.applied_marks.lock().unwrap().insert((*tx, log_index));
        Ok(())
    }
}

impl PersonStore for MemoryStore {
    fn get_person(&self, nullifier: &Nullifier) -> Result<Option<Person>, StoreError> {
        Ok(self.persons.lock().unwrap().get(nullifier).cloned())
    }

    fn put_person(&self, person: &Person) -> Result<(), StoreError> {
        self.persons
            .lock()
            .unwrap()
            .insert(person.nullifier.clone(), person.clone());
        Ok(())
    }

    fn person_count(&self) -> Result<u64, StoreError> {
        Ok(self.persons.lock().unwrap().len() as u64)
    }
}

impl AggregateStore for MemoryStore {
    fn get_row(&self, key: &AggregateKey) -> Result<Option<AggregateRow>, StoreError> {
        Ok(self.aggregates.lock().unwrap().get(key).cloned())
    }

    fn put_row(&self, row: &AggregateRow) -> Result<(), StoreError> {
        self.aggregates.lock().unwrap().insert(row.key(), row.clone());
        Ok(())
    }

    fn rows_for_survey(&self, survey: &Address) -> Result<Vec<AggregateRow>, StoreError> {
        Ok(self
            .aggregates
            .lock()
            .unwrap()
            .values()
            .filter(|row| &row.survey == survey)
            .cloned()
            .collect())
    }

    fn total_count(&self) -> Result<u64, StoreError> {
        Ok(self.aggregates.lock().unwrap().values().map(|r| r.count).sum())
    }
}

impl FundingQueueStore for MemoryStore {
    fn pending_claims(&self) -> Result<Vec<FundingClaim>, StoreError> {
        Ok(self.funding_queue.lock().unwrap().clone())
    }

    fn push_claim(&self, claim: &FundingClaim) -> Result<(), StoreError> {
        self.funding_queue.lock().unwrap().push(claim.clone());
        Ok(())
    }

    fn resolve_claims(&self, survey: &Address) -> Result<(), StoreError> {
        self.funding_queue
            .lock()
            .unwrap()
            .retain(|claim| &claim.survey != survey);
        Ok(())
    }
}

impl EventLedger for MemoryStore {
    fn append_event(&self, record: &serde_json::Value) -> Result<(), StoreError> {
        self.events.lock().unwrap().push(record.clone());
        Ok(())
    }
}

impl SnapshotSink for MemoryStore {
    fn publish(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        *self.published.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }
}
