//! Snapshot assembly and downstream push.

use crate::{EntityStore, IndexError};

use std::collections::BTreeMap;
use std::time::Duration;
use tally_store::{Snapshot, StateDescriptor, SurveySummary};
use tally_types::{SigningDomain, Timestamp};
use tracing::{debug, warn};

/// Assemble the full external representation of the entity store.
pub fn build_snapshot<S: EntityStore>(
    store: &S,
    signing_domain: &SigningDomain,
    now: Timestamp,
) -> Result<Snapshot, IndexError> {
    let records = store.iter_surveys()?;

    let mut surveys = BTreeMap::new();
    let mut list = Vec::with_capacity(records.len());
    for record in records {
        list.push(SurveySummary::from_record(&record, now));
        surveys.insert(record.address.clone(), record);
    }

    let balances: BTreeMap<_, _> = store.iter_balances()?.into_iter().collect();

    Ok(Snapshot {
        surveys,
        list,
        balances,
        state: StateDescriptor {
            last_height: store.cursor()?.unwrap_or(0),
            updated_at: now,
        },
        signing_domain: signing_domain.clone(),
    })
}

/// Bounded-retry push of the published snapshot to a downstream admin
/// API. Exhaustion is logged and swallowed; the pipeline never blocks on
/// the downstream being healthy.
#[derive(Clone)]
pub struct DownstreamPusher {
    http_client: reqwest::Client,
    url: String,
    attempts: u32,
    backoff_ms: u64,
}

impl DownstreamPusher {
    pub fn new(url: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            url: url.into(),
            attempts: 3,
            backoff_ms: 500,
        }
    }

    pub fn with_attempts(mut self, attempts: u32, backoff_ms: u64) -> Self {
        self.attempts = attempts.max(1);
        self.backoff_ms = backoff_ms;
        self
    }

    /// Push `snapshot`, retrying a fixed number of times with doubling
    /// backoff.
    pub async fn push(&self, snapshot: &Snapshot) {
        let mut backoff = self.backoff_ms;
        for attempt in 1..=self.attempts {
            let result = self
                .http_client
                .post(&self.url)
                .json(snapshot)
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => {
                    debug!(url = %self.url, attempt, "snapshot pushed downstream");
                    return;
                }
                Ok(response) => {
                    warn!(url = %self.url, attempt, status = %response.status(), "downstream push rejected");
                }
                Err(e) => {
                    warn!(url = %self.url, attempt, error = %e, "downstream push failed");
                }
            }
            if attempt < self.attempts {
                tokio::time::sleep(Duration::from_millis(backoff)).await;
                backoff = backoff.saturating_mul(2);
            }
        }
        warn!(url = %self.url, attempts = self.attempts, "downstream push abandoned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_store::{BalanceStore, CursorStore, MemoryStore, SurveyRecord, SurveyStore};
    use tally_types::{Address, ContentHash, SurveyStatus};

    fn addr(byte: u8) -> Address {
        Address::from_bytes(&[byte; 20])
    }

    #[test]
    fn snapshot_contains_map_list_and_state() {
        let store = MemoryStore::new();
        for byte in [1u8, 2] {
            store
                .put_survey(&SurveyRecord::new(
                    addr(byte),
                    addr(0xcc),
                    Timestamp::new(100),
                    Timestamp::new(200),
                    0,
                    ContentHash::ZERO,
                ))
                .unwrap();
        }
        store.set_balance(&addr(0x77), 4).unwrap();
        store.set_cursor(99).unwrap();

        let domain = SigningDomain::new("Tally", "1", 7, addr(0xde));
        let snapshot = build_snapshot(&store, &domain, Timestamp::new(150)).unwrap();

        assert_eq!(snapshot.surveys.len(), 2);
        assert_eq!(snapshot.list.len(), 2);
        assert!(snapshot
            .list
            .iter()
            .all(|row| row.status == SurveyStatus::Active));
        assert_eq!(snapshot.balances.get(&addr(0x77)), Some(&4));
        assert_eq!(snapshot.state.last_height, 99);
        assert_eq!(snapshot.signing_domain.chain_id, 7);
    }

    #[test]
    fn empty_store_snapshot_is_well_formed() {
        let store = MemoryStore::new();
        let domain = SigningDomain::new("Tally", "1", 7, addr(0xde));
        let snapshot = build_snapshot(&store, &domain, Timestamp::new(1)).unwrap();
        assert!(snapshot.surveys.is_empty());
        assert_eq!(snapshot.state.last_height, 0);
    }
}
