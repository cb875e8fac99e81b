//! The JSON-file store implementation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use tally_store::{
    AggregateKey, AggregateRow, AggregateStore, AppliedMarkStore, BalanceStore, CursorStore,
    EventLedger, FundingClaim, FundingQueueStore, Person, PersonStore, Snapshot, SnapshotSink,
    StoreError, SurveyRecord, SurveyStore, VoteMarkStore,
};
use tally_types::{Address, Nullifier, TxHash};

const CURSOR_FILE: &str = "cursor.json";
const SURVEYS_FILE: &str = "surveys.json";
const BALANCES_FILE: &str = "balances.json";
const VOTE_MARKS_FILE: &str = "vote_marks.json";
const APPLIED_MARKS_FILE: &str = "applied_marks.json";
const PERSONS_FILE: &str = "persons.json";
const AGGREGATES_FILE: &str = "aggregates.json";
const FUNDING_FILE: &str = "funding_queue.json";
const SNAPSHOT_FILE: &str = "snapshot.json";
const EVENTS_FILE: &str = "events.ndjson";

/// Write `value` to `path` atomically: serialize to `<path>.tmp`, then
/// rename over the target. Consumers reading `path` see either the old
/// document or the new one, never a torn write.
pub fn atomic_write<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    std::fs::write(&tmp, bytes).map_err(|e| StoreError::Backend(e.to_string()))?;
    std::fs::rename(&tmp, path).map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(())
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    match std::fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corruption(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(StoreError::Backend(e.to_string())),
    }
}

#[derive(Default)]
struct State {
    cursor: Option<u64>,
    surveys: BTreeMap<Address, SurveyRecord>,
    balances: BTreeMap<Address, u64>,
    vote_marks: Vec<(Address, Address)>,
    applied_marks: Vec<(TxHash, u64)>,
    persons: BTreeMap<Nullifier, Person>,
    aggregates: Vec<AggregateRow>,
    funding_queue: Vec<FundingClaim>,
}

/// JSON-file implementation of the Tally storage traits.
pub struct JsonStore {
    dir: PathBuf,
    state: Mutex<State>,
}

impl std::fmt::Debug for JsonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStore").field("dir", &self.dir).finish()
    }
}

impl JsonStore {
    /// Open (or initialize) a store under `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Backend(e.to_string()))?;

        let state = State {
            cursor: load_or_default::<Option<u64>>(&dir.join(CURSOR_FILE))?,
            surveys: load_or_default(&dir.join(SURVEYS_FILE))?,
            balances: load_or_default(&dir.join(BALANCES_FILE))?,
            vote_marks: load_or_default(&dir.join(VOTE_MARKS_FILE))?,
            applied_marks: load_or_default(&dir.join(APPLIED_MARKS_FILE))?,
            persons: load_or_default(&dir.join(PERSONS_FILE))?,
            aggregates: load_or_default(&dir.join(AGGREGATES_FILE))?,
            funding_queue: load_or_default(&dir.join(FUNDING_FILE))?,
        };
        debug!(dir = %dir.display(), surveys = state.surveys.len(), "opened JSON store");
        Ok(Self {
            dir,
            state: Mutex::new(state),
        })
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }
}

impl CursorStore for JsonStore {
    fn cursor(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.state.lock().unwrap().cursor)
    }

    fn set_cursor(&self, height: u64) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.cursor = Some(height);
        atomic_write(&self.path(CURSOR_FILE), &state.cursor)
    }
}

impl SurveyStore for JsonStore {
    fn get_survey(&self, address: &Address) -> Result<Option<SurveyRecord>, StoreError> {
        Ok(self.state.lock().unwrap().surveys.get(address).cloned())
    }

    fn put_survey(&self, record: &SurveyRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.surveys.insert(record.address.clone(), record.clone());
        atomic_write(&self.path(SURVEYS_FILE), &state.surveys)
    }

    fn contains_survey(&self, address: &Address) -> Result<bool, StoreError> {
        Ok(self.state.lock().unwrap().surveys.contains_key(address))
    }

    fn survey_addresses(&self) -> Result<Vec<Address>, StoreError> {
        Ok(self.state.lock().unwrap().surveys.keys().cloned().collect())
    }

    fn iter_surveys(&self) -> Result<Vec<SurveyRecord>, StoreError> {
        Ok(self.state.lock().unwrap().surveys.values().cloned().collect())
    }
}

impl BalanceStore for JsonStore {
    fn balance(&self, voter: &Address) -> Result<u64, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .balances
            .get(voter)
            .copied()
            .unwrap_or(0))
    }

    fn set_balance(&self, voter: &Address, count: u64) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.balances.insert(voter.clone(), count);
        atomic_write(&self.path(BALANCES_FILE), &state.balances)
    }

    fn iter_balances(&self) -> Result<Vec<(Address, u64)>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .balances
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect())
    }
}

impl VoteMarkStore for JsonStore {
    fn vote_marked(&self, survey: &Address, voter: &Address) -> Result<bool, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .vote_marks
            .iter()
            .any(|(s, v)| s == survey && v == voter))
    }

    fn mark_vote(&self, survey: &Address, voter: &Address) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.vote_marks.push((survey.clone(), voter.clone()));
        atomic_write(&self.path(VOTE_MARKS_FILE), &state.vote_marks)
    }
}

impl AppliedMarkStore for JsonStore {
    fn event_applied(&self, tx: &TxHash, log_index: u64) -> Result<bool, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .applied_marks
            .iter()
            .any(|(t, i)| t == tx && *i == log_index))
    }

    fn mark_event_applied(&self, tx: &TxHash, log_index: u64) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.applied_marks.push((*tx, log_index));
        atomic_write(&self.path(APPLIED_MARKS_FILE), &state.applied_marks)
    }
}

impl PersonStore for JsonStore {
    fn get_person(&self, nullifier: &Nullifier) -> Result<Option<Person>, StoreError> {
        Ok(self.state.lock().unwrap().persons.get(nullifier).cloned())
    }

    fn put_person(&self, person: &Person) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.persons.insert(person.nullifier.clone(), person.clone());
        atomic_write(&self.path(PERSONS_FILE), &state.persons)
    }

    fn person_count(&self) -> Result<u64, StoreError> {
        Ok(self.state.lock().unwrap().persons.len() as u64)
    }
}

impl AggregateStore for JsonStore {
    fn get_row(&self, key: &AggregateKey) -> Result<Option<AggregateRow>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .aggregates
            .iter()
            .find(|row| &row.key() == key)
            .cloned())
    }

    fn put_row(&self, row: &AggregateRow) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let key = row.key();
        match state.aggregates.iter_mut().find(|r| r.key() == key) {
            Some(existing) => *existing = row.clone(),
            None => state.aggregates.push(row.clone()),
        }
        atomic_write(&self.path(AGGREGATES_FILE), &state.aggregates)
    }

    fn rows_for_survey(&self, survey: &Address) -> Result<Vec<AggregateRow>, StoreError> {
        let mut rows: Vec<AggregateRow> = self
            .state
            .lock()
            .unwrap()
            .aggregates
            .iter()
            .filter(|row| &row.survey == survey)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.key());
        Ok(rows)
    }

    fn total_count(&self) -> Result<u64, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .aggregates
            .iter()
            .map(|r| r.count)
            .sum())
    }
}

impl FundingQueueStore for JsonStore {
    fn pending_claims(&self) -> Result<Vec<FundingClaim>, StoreError> {
        Ok(self.state.lock().unwrap().funding_queue.clone())
    }

    fn push_claim(&self, claim: &FundingClaim) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.funding_queue.push(claim.clone());
        atomic_write(&self.path(FUNDING_FILE), &state.funding_queue)
    }

    fn resolve_claims(&self, survey: &Address) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.funding_queue.retain(|claim| &claim.survey != survey);
        atomic_write(&self.path(FUNDING_FILE), &state.funding_queue)
    }
}

impl EventLedger for JsonStore {
    fn append_event(&self, record: &serde_json::Value) -> Result<(), StoreError> {
        let line = serde_json::to_string(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(EVENTS_FILE))
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| StoreError::Backend(e.to_string()))
    }
}

impl SnapshotSink for JsonStore {
    fn publish(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        atomic_write(&self.path(SNAPSHOT_FILE), snapshot)
    }
}
