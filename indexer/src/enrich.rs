//! Enrichment stage — metadata join and funding verification.
//!
//! Both sub-steps are idempotent and safe to re-run every cycle. The
//! metadata join binds off-chain documents to records via an integrity
//! hash; funding verification accepts off-chain funding claims only
//! after checking the transaction against the chain. Accepted facts are
//! routed through the reducer as synthesized events so the event ledger
//! stays the single history.

use crate::{reduce, EntityStore, IndexError, ScanConfig};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tally_chain::LedgerSource;
use tally_crypto::blake2b_256;
use tally_events::{DomainEvent, EventKind};
use tally_types::{Address, ContentHash, Timestamp, TokenAmount, TxHash};
use tracing::{debug, info, warn};

/// An off-chain survey metadata document, fetched by convention path.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataDoc {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Reward in raw units and as a whole-token display string.
    #[serde(default)]
    pub reward: TokenAmount,
    #[serde(default)]
    pub reward_tokens: String,
    #[serde(default)]
    pub gate: Option<Address>,
    #[serde(default)]
    pub eligibility: Vec<String>,
    /// Optional schedule, seconds or milliseconds (normalized on use).
    #[serde(default)]
    pub start_time: Option<u64>,
    #[serde(default)]
    pub end_time: Option<u64>,
}

/// Deterministic integrity hash of a document.
///
/// `serde_json` maps are key-ordered, so the compact rendering of the
/// document value is a stable byte representation.
pub fn document_hash(doc: &MetadataDoc) -> ContentHash {
    let value = serde_json::to_value(doc).expect("MetadataDoc is always serializable");
    ContentHash::new(blake2b_256(value.to_string().as_bytes()))
}

/// Capability for fetching metadata documents.
pub trait MetadataSource {
    fn fetch(
        &self,
        address: &Address,
    ) -> impl std::future::Future<Output = Result<Option<MetadataDoc>, IndexError>> + Send;
}

/// HTTP metadata source: `GET {base}/{address}.json`, 404 means absent.
pub struct WebMetadataSource {
    http_client: reqwest::Client,
    base_url: String,
}

impl WebMetadataSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }
}

impl MetadataSource for WebMetadataSource {
    async fn fetch(&self, address: &Address) -> Result<Option<MetadataDoc>, IndexError> {
        let url = format!("{}/{}.json", self.base_url.trim_end_matches('/'), address);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| IndexError::Metadata(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(IndexError::Metadata(format!("HTTP status {}", response.status())));
        }
        let doc = response
            .json()
            .await
            .map_err(|e| IndexError::Metadata(format!("bad metadata document: {e}")))?;
        Ok(Some(doc))
    }
}

/// In-memory metadata source, used by tests and as the fallback when no
/// document base URL is configured (every fetch reports absence).
#[derive(Default)]
pub struct MemoryMetadataSource {
    docs: Mutex<HashMap<Address, MetadataDoc>>,
}

impl MemoryMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, address: Address, doc: MetadataDoc) {
        self.docs.lock().unwrap().insert(address, doc);
    }
}

impl MetadataSource for MemoryMetadataSource {
    async fn fetch(&self, address: &Address) -> Result<Option<MetadataDoc>, IndexError> {
        Ok(self.docs.lock().unwrap().get(address).cloned())
    }
}

/// Runs the enrichment sub-steps against the entity store.
pub struct Enricher<'a, L, M> {
    ledger: &'a L,
    metadata: &'a M,
    config: &'a ScanConfig,
}

impl<'a, L: LedgerSource, M: MetadataSource> Enricher<'a, L, M> {
    pub fn new(ledger: &'a L, metadata: &'a M, config: &'a ScanConfig) -> Self {
        Self {
            ledger,
            metadata,
            config,
        }
    }

    /// Run every sub-step once.
    pub async fn run<S: EntityStore>(&self, store: &S) -> Result<(), IndexError> {
        self.metadata_join(store).await?;
        self.verify_funding(store).await?;
        self.refresh_balances(store).await?;
        Ok(())
    }

    /// Join every record with its off-chain document and verify integrity.
    pub async fn metadata_join<S: EntityStore>(&self, store: &S) -> Result<(), IndexError> {
        for record in store.iter_surveys()? {
            let doc = match self.metadata.fetch(&record.address).await {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(survey = %record.address, error = %e, "metadata fetch failed, will retry next cycle");
                    continue;
                }
            };

            match doc {
                None => {
                    // Absence is not an error: placeholder fields, invalid flag.
                    let mut updated = record.clone();
                    if updated.title.is_empty() {
                        updated.title = format!("Survey {}", &record.address.as_str()[..10]);
                    }
                    updated.meta_valid = false;
                    if updated != record {
                        store.put_survey(&updated)?;
                    }
                }
                Some(doc) => {
                    self.backfill_schedule(store, &record.address, &doc)?;

                    let mut updated = store
                        .get_survey(&record.address)?
                        .unwrap_or_else(|| record.clone());
                    let valid = document_hash(&doc) == updated.meta_hash;
                    if !valid {
                        debug!(survey = %record.address, "metadata hash mismatch");
                    }
                    updated.meta_valid = valid;
                    updated.title = doc.title.clone();
                    updated.summary = doc.summary.clone();
                    updated.reward = doc.reward;
                    updated.reward_tokens = doc.reward_tokens.clone();
                    updated.gate = doc.gate.clone();
                    updated.eligibility = doc.eligibility.clone();
                    if updated != record {
                        store.put_survey(&updated)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Backfill a missing schedule from the document, routed through the
    /// reducer so the event ledger records it.
    fn backfill_schedule<S: EntityStore>(
        &self,
        store: &S,
        survey: &Address,
        doc: &MetadataDoc,
    ) -> Result<(), IndexError> {
        let Some(record) = store.get_survey(survey)? else {
            return Ok(());
        };
        if !(record.start_time.is_zero() && record.end_time.is_zero()) {
            return Ok(());
        }
        let (Some(start), Some(end)) = (doc.start_time, doc.end_time) else {
            return Ok(());
        };

        let event = DomainEvent {
            address: survey.clone(),
            block_number: 0,
            log_index: 0,
            timestamp: Timestamp::now(),
            tx_hash: TxHash::ZERO,
            kind: EventKind::BackfilledSchedule {
                start_time: Timestamp::normalize(start),
                end_time: Timestamp::normalize(end),
            },
        };
        info!(survey = %survey, "backfilling schedule from metadata document");
        store.append_event(&serde_json::to_value(&event).map_err(|e| {
            IndexError::Serialization(e.to_string())
        })?)?;
        reduce(store, &event)
    }

    /// Verify pending off-chain funding claims against the chain.
    ///
    /// Accepts a claim only when the receipt succeeded, confirmation
    /// depth is sufficient, the recipient is the treasury, the sender is
    /// the survey's creator, and the value covers the planned reward.
    /// Already-funded records are never re-evaluated.
    pub async fn verify_funding<S: EntityStore>(&self, store: &S) -> Result<(), IndexError> {
        let claims = store.pending_claims()?;
        if claims.is_empty() {
            return Ok(());
        }
        let latest = self.ledger.latest_block_height().await?;

        for claim in claims {
            let Some(record) = store.get_survey(&claim.survey)? else {
                warn!(survey = %claim.survey, "funding claim for unknown survey");
                continue;
            };
            if record.funded {
                store.resolve_claims(&claim.survey)?;
                continue;
            }

            let (tx, receipt) = match (
                self.ledger.get_transaction(&claim.funding_tx).await,
                self.ledger.get_receipt(&claim.funding_tx).await,
            ) {
                (Ok(Some(tx)), Ok(Some(receipt))) => (tx, receipt),
                (Ok(_), Ok(_)) => {
                    debug!(tx = %claim.funding_tx, "funding transaction not yet visible");
                    continue;
                }
                (Err(e), _) | (_, Err(e)) => {
                    warn!(tx = %claim.funding_tx, error = %e, "funding lookup failed, will retry next cycle");
                    continue;
                }
            };

            let confirmations = latest.saturating_sub(receipt.block_number) + 1;
            let accepted = receipt.status
                && confirmations >= self.config.min_confirmations
                && tx.to.as_ref() == Some(&self.config.treasury)
                && tx.from == record.creator
                && tx.value >= record.planned_reward;

            if !accepted {
                debug!(
                    survey = %claim.survey,
                    tx = %claim.funding_tx,
                    status = receipt.status,
                    confirmations,
                    "funding claim not accepted"
                );
                continue;
            }

            let event = DomainEvent {
                address: claim.survey.clone(),
                block_number: receipt.block_number,
                log_index: 0,
                timestamp: Timestamp::now(),
                tx_hash: claim.funding_tx,
                kind: EventKind::TreasuryFunded {
                    funder: tx.from.clone(),
                    amount: tx.value,
                    funding_tx: claim.funding_tx,
                },
            };
            info!(survey = %claim.survey, tx = %claim.funding_tx, "funding claim verified");
            store.append_event(&serde_json::to_value(&event).map_err(|e| {
                IndexError::Serialization(e.to_string())
            })?)?;
            reduce(store, &event)?;
            store.resolve_claims(&claim.survey)?;
        }
        Ok(())
    }

    /// Overwrite each record's live balance.
    pub async fn refresh_balances<S: EntityStore>(&self, store: &S) -> Result<(), IndexError> {
        for record in store.iter_surveys()? {
            match self.ledger.get_balance(&record.address).await {
                Ok(balance) => {
                    if balance != record.balance {
                        let mut updated = record;
                        updated.balance = balance;
                        store.put_survey(&updated)?;
                    }
                }
                Err(e) => {
                    warn!(survey = %record.address, error = %e, "balance refresh failed");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_chain::{MemoryLedger, ReceiptInfo, TransactionInfo};
    use tally_store::{
        FundingClaim, FundingQueueStore, MemoryStore, SurveyRecord, SurveyStore,
    };

    fn addr(byte: u8) -> Address {
        Address::from_bytes(&[byte; 20])
    }

    fn seeded_record(store: &MemoryStore, meta_hash: ContentHash) -> SurveyRecord {
        let mut record = SurveyRecord::new(
            addr(1),
            addr(0xcc),
            Timestamp::new(100),
            Timestamp::new(200),
            0,
            meta_hash,
        );
        record.planned_reward = TokenAmount::new(1000);
        store.put_survey(&record).unwrap();
        record
    }

    fn doc() -> MetadataDoc {
        MetadataDoc {
            title: "City census".into(),
            summary: "Annual".into(),
            reward: TokenAmount::new(1000),
            reward_tokens: "0.001".into(),
            ..Default::default()
        }
    }

    fn config() -> ScanConfig {
        let mut c = ScanConfig::new(addr(0xfa), addr(0xea));
        c.min_confirmations = 3;
        c
    }

    #[test]
    fn document_hash_is_deterministic_and_field_sensitive() {
        let d1 = doc();
        let d2 = doc();
        assert_eq!(document_hash(&d1), document_hash(&d2));

        let mut d3 = doc();
        d3.title = "Other".into();
        assert_ne!(document_hash(&d1), document_hash(&d3));
    }

    #[tokio::test]
    async fn join_marks_valid_when_hash_matches() {
        let ledger = MemoryLedger::new();
        let metadata = MemoryMetadataSource::new();
        let store = MemoryStore::new();
        let config = config();

        seeded_record(&store, document_hash(&doc()));
        metadata.insert(addr(1), doc());

        let enricher = Enricher::new(&ledger, &metadata, &config);
        enricher.metadata_join(&store).await.unwrap();

        let record = store.get_survey(&addr(1)).unwrap().unwrap();
        assert!(record.meta_valid);
        assert_eq!(record.title, "City census");
        assert_eq!(record.reward.raw(), 1000);
    }

    #[tokio::test]
    async fn join_marks_invalid_on_hash_mismatch() {
        let ledger = MemoryLedger::new();
        let metadata = MemoryMetadataSource::new();
        let store = MemoryStore::new();
        let config = config();

        seeded_record(&store, ContentHash::new([0xdd; 32]));
        metadata.insert(addr(1), doc());

        let enricher = Enricher::new(&ledger, &metadata, &config);
        enricher.metadata_join(&store).await.unwrap();

        let record = store.get_survey(&addr(1)).unwrap().unwrap();
        assert!(!record.meta_valid);
        // Display fields still joined for downstream consumers.
        assert_eq!(record.title, "City census");
    }

    #[tokio::test]
    async fn absent_document_yields_placeholder_and_invalid() {
        let ledger = MemoryLedger::new();
        let metadata = MemoryMetadataSource::new();
        let store = MemoryStore::new();
        let config = config();
        seeded_record(&store, ContentHash::ZERO);

        let enricher = Enricher::new(&ledger, &metadata, &config);
        enricher.metadata_join(&store).await.unwrap();

        let record = store.get_survey(&addr(1)).unwrap().unwrap();
        assert!(!record.meta_valid);
        assert!(record.title.starts_with("Survey 0x"));
    }

    #[tokio::test]
    async fn schedule_backfilled_from_document() {
        let ledger = MemoryLedger::new();
        let metadata = MemoryMetadataSource::new();
        let store = MemoryStore::new();
        let config = config();

        let mut record = seeded_record(&store, ContentHash::ZERO);
        record.start_time = Timestamp::EPOCH;
        record.end_time = Timestamp::EPOCH;
        store.put_survey(&record).unwrap();

        let mut document = doc();
        document.start_time = Some(1_700_000_000_000); // milliseconds
        document.end_time = Some(1_700_100_000);
        metadata.insert(addr(1), document);

        let enricher = Enricher::new(&ledger, &metadata, &config);
        enricher.metadata_join(&store).await.unwrap();

        let record = store.get_survey(&addr(1)).unwrap().unwrap();
        assert_eq!(record.start_time.as_secs(), 1_700_000_000);
        assert_eq!(record.end_time.as_secs(), 1_700_100_000);
        assert_eq!(store.event_records().len(), 1);

        // Re-running the join must not append another backfill event.
        enricher.metadata_join(&store).await.unwrap();
        assert_eq!(store.event_records().len(), 1);
    }

    struct FundingFixture {
        ledger: MemoryLedger,
        store: MemoryStore,
        config: ScanConfig,
    }

    fn funding_fixture(
        status: bool,
        to: Address,
        from: Address,
        value: u128,
        confirmations: u64,
    ) -> FundingFixture {
        let ledger = MemoryLedger::new();
        let store = MemoryStore::new();
        let config = config();

        seeded_record(&store, ContentHash::ZERO);
        let tx_hash = TxHash::new([0x42; 32]);
        let included_at = 100u64;
        ledger.set_latest(included_at + confirmations.saturating_sub(1));
        ledger.put_transaction(
            TransactionInfo {
                hash: tx_hash,
                from,
                to: Some(to),
                value: TokenAmount::new(value),
            },
            ReceiptInfo {
                status,
                block_number: included_at,
            },
        );
        store
            .push_claim(&FundingClaim {
                survey: addr(1),
                funding_tx: tx_hash,
                submitted_at: Timestamp::new(0),
            })
            .unwrap();

        FundingFixture {
            ledger,
            store,
            config,
        }
    }

    async fn run_funding(fixture: &FundingFixture) -> SurveyRecord {
        let metadata = MemoryMetadataSource::new();
        let enricher = Enricher::new(&fixture.ledger, &metadata, &fixture.config);
        enricher.verify_funding(&fixture.store).await.unwrap();
        fixture.store.get_survey(&addr(1)).unwrap().unwrap()
    }

    #[tokio::test]
    async fn funding_accepted_when_all_conditions_hold() {
        let fixture = funding_fixture(true, addr(0xea), addr(0xcc), 1000, 3);
        let record = run_funding(&fixture).await;
        assert!(record.funded);
        assert_eq!(record.funding_tx, Some(TxHash::new([0x42; 32])));
        assert!(fixture.store.pending_claims().unwrap().is_empty());
    }

    #[tokio::test]
    async fn funding_rejected_on_failed_receipt() {
        let fixture = funding_fixture(false, addr(0xea), addr(0xcc), 1000, 3);
        assert!(!run_funding(&fixture).await.funded);
    }

    #[tokio::test]
    async fn funding_rejected_on_wrong_recipient() {
        let fixture = funding_fixture(true, addr(0x99), addr(0xcc), 1000, 3);
        assert!(!run_funding(&fixture).await.funded);
    }

    #[tokio::test]
    async fn funding_rejected_on_wrong_sender() {
        let fixture = funding_fixture(true, addr(0xea), addr(0x99), 1000, 3);
        assert!(!run_funding(&fixture).await.funded);
    }

    #[tokio::test]
    async fn funding_rejected_on_insufficient_value() {
        let fixture = funding_fixture(true, addr(0xea), addr(0xcc), 999, 3);
        assert!(!run_funding(&fixture).await.funded);
    }

    #[tokio::test]
    async fn funding_rejected_on_shallow_confirmation() {
        let fixture = funding_fixture(true, addr(0xea), addr(0xcc), 1000, 2);
        assert!(!run_funding(&fixture).await.funded);
    }

    #[tokio::test]
    async fn funded_record_is_never_reevaluated() {
        let fixture = funding_fixture(true, addr(0xea), addr(0xcc), 1000, 3);
        let record = run_funding(&fixture).await;
        assert!(record.funded);

        // A second claim for the same survey resolves without changing the
        // recorded funding transaction.
        fixture
            .store
            .push_claim(&FundingClaim {
                survey: addr(1),
                funding_tx: TxHash::new([0x43; 32]),
                submitted_at: Timestamp::new(5),
            })
            .unwrap();
        let record = run_funding(&fixture).await;
        assert_eq!(record.funding_tx, Some(TxHash::new([0x42; 32])));
        assert!(fixture.store.pending_claims().unwrap().is_empty());
    }

    #[tokio::test]
    async fn balances_are_overwritten() {
        let ledger = MemoryLedger::new();
        let metadata = MemoryMetadataSource::new();
        let store = MemoryStore::new();
        let config = config();
        seeded_record(&store, ContentHash::ZERO);
        ledger.set_balance(addr(1), TokenAmount::new(777));

        let enricher = Enricher::new(&ledger, &metadata, &config);
        enricher.refresh_balances(&store).await.unwrap();
        assert_eq!(
            store.get_survey(&addr(1)).unwrap().unwrap().balance.raw(),
            777
        );

        ledger.set_balance(addr(1), TokenAmount::new(5));
        enricher.refresh_balances(&store).await.unwrap();
        assert_eq!(store.get_survey(&addr(1)).unwrap().unwrap().balance.raw(), 5);
    }
}
