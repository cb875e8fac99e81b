//! The full scan → reduce → enrich → publish cycle.

use crate::{
    build_snapshot, reduce, DownstreamPusher, EntityStore, Enricher, IndexError, MetadataSource,
    ScanConfig, Scanner,
};

use std::collections::BTreeSet;
use tally_chain::LedgerSource;
use tally_types::{Address, SigningDomain, Timestamp};
use tracing::info;

/// What one cycle accomplished.
#[derive(Clone, Debug)]
pub struct CycleReport {
    /// Last height folded in, `None` when the cursor was already at tip.
    pub scanned_to: Option<u64>,
    pub events_applied: u64,
    pub survey_count: u64,
}

/// One sequential batch job per invocation; re-entrancy across
/// invocations must be prevented by the caller (the cursor
/// read-then-write is not transactional).
pub struct Pipeline<L, M, S> {
    ledger: L,
    metadata: M,
    store: S,
    config: ScanConfig,
    signing_domain: SigningDomain,
    pusher: Option<DownstreamPusher>,
}

impl<L, M, S> Pipeline<L, M, S>
where
    L: LedgerSource,
    M: MetadataSource,
    S: EntityStore,
{
    pub fn new(
        ledger: L,
        metadata: M,
        store: S,
        config: ScanConfig,
        signing_domain: SigningDomain,
    ) -> Self {
        Self {
            ledger,
            metadata,
            store,
            config,
            signing_domain,
            pusher: None,
        }
    }

    /// Attach a downstream push target.
    pub fn with_pusher(mut self, pusher: DownstreamPusher) -> Self {
        self.pusher = Some(pusher);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one full cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport, IndexError> {
        let latest = self.ledger.latest_block_height().await?;
        let cursor = self.store.cursor()?;
        let mut known: BTreeSet<Address> =
            self.store.survey_addresses()?.into_iter().collect();

        let scanner = Scanner::new(&self.ledger, &self.config);
        let store = &self.store;
        let mut events_applied = 0u64;

        let scanned_to = scanner
            .scan(cursor, latest, &mut known, |batch_end, events| {
                for event in &events {
                    let record = serde_json::to_value(event)
                        .map_err(|e| IndexError::Serialization(e.to_string()))?;
                    store.append_event(&record)?;
                    reduce(store, event)?;
                    events_applied += 1;
                }
                // The batch is durably folded in; only now may the
                // cursor advance.
                store.set_cursor(batch_end)?;
                Ok(())
            })
            .await?;

        let enricher = Enricher::new(&self.ledger, &self.metadata, &self.config);
        enricher.run(store).await?;

        let snapshot = build_snapshot(store, &self.signing_domain, Timestamp::now())?;
        let survey_count = snapshot.list.len() as u64;
        store.publish(&snapshot)?;

        if let Some(pusher) = &self.pusher {
            let pusher = pusher.clone();
            let snapshot = snapshot.clone();
            tokio::spawn(async move {
                pusher.push(&snapshot).await;
            });
        }

        info!(
            scanned_to = ?scanned_to,
            events_applied,
            survey_count,
            decoded = scanner.stats().get("logs_decoded"),
            skipped = scanner.stats().get("logs_skipped"),
            "cycle complete"
        );

        Ok(CycleReport {
            scanned_to,
            events_applied,
            survey_count,
        })
    }
}
