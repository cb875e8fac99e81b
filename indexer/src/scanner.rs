//! Checkpointed scanner with two-pass discovery.
//!
//! Pass 1 scans only the factory address for "instance deployed" events;
//! each match registers a new address-of-interest. Pass 2 scans the full
//! discovered set for instance-level events. Both passes run per batch so
//! an instance deployed and voted within the same batch is still seen, and
//! the merged batch is handed downstream in `(height, log_index)` order.
//!
//! Failure discipline: a discovery failure is fatal for the invocation
//! (the cursor must not advance past undiscovered addresses); an instance
//! batch failure is logged and that batch's instance events are skipped.

use crate::{IndexError, ScanConfig};
use std::collections::{BTreeSet, HashMap};
use tally_chain::{ChainError, LedgerSource, LogEntry};
use tally_events::{DomainEvent, EventKind, SchemaRegistry};
use tally_types::{Address, Timestamp};
use tally_utils::StatsCounter;
use tracing::{debug, info, warn};

/// Drives batched range queries and hands decoded events to a per-batch
/// callback. The callback is responsible for durably folding the events
/// in and advancing the cursor.
pub struct Scanner<'a, L> {
    ledger: &'a L,
    config: &'a ScanConfig,
    registry: SchemaRegistry,
    stats: StatsCounter,
}

impl<'a, L: LedgerSource> Scanner<'a, L> {
    pub fn new(ledger: &'a L, config: &'a ScanConfig) -> Self {
        Self {
            ledger,
            config,
            registry: SchemaRegistry::new(),
            stats: StatsCounter::new(&[
                "logs_decoded",
                "logs_skipped",
                "instance_batches_skipped",
                "fallback_queries",
            ]),
        }
    }

    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    /// Scan `[effective_start, latest]` in fixed batches, strictly in
    /// increasing height order.
    ///
    /// `known` is the set of survey addresses of interest; newly
    /// discovered addresses are inserted as pass 1 finds them. Returns
    /// the last fully handed-over height, or `None` when there was
    /// nothing to do (not an error).
    pub async fn scan<F>(
        &self,
        cursor: Option<u64>,
        latest: u64,
        known: &mut BTreeSet<Address>,
        mut on_batch: F,
    ) -> Result<Option<u64>, IndexError>
    where
        F: FnMut(u64, Vec<DomainEvent>) -> Result<(), IndexError>,
    {
        let start = self.config.effective_start(cursor, latest);
        if start > latest {
            debug!(start, latest, "cursor at tip, nothing to scan");
            return Ok(None);
        }

        info!(start, latest, batch = self.config.batch_size, "scanning");
        let mut last_handed = None;
        let mut from = start;
        while from <= latest {
            let to = from
                .saturating_add(self.config.batch_size.saturating_sub(1))
                .min(latest);

            let events = self.scan_batch(from, to, known).await?;
            on_batch(to, events)?;
            last_handed = Some(to);
            from = to + 1;
        }
        Ok(last_handed)
    }

    async fn scan_batch(
        &self,
        from: u64,
        to: u64,
        known: &mut BTreeSet<Address>,
    ) -> Result<Vec<DomainEvent>, IndexError> {
        let mut ts_cache: HashMap<u64, Timestamp> = HashMap::new();
        let mut events = Vec::new();

        // Pass 1: discovery. Fatal on failure.
        let factory = std::slice::from_ref(&self.config.factory);
        let factory_logs = self
            .query_with_retry(from, to, factory)
            .await
            .map_err(|source| IndexError::Discovery { from, to, source })?;

        for log in &factory_logs {
            let ts = self
                .timestamp_for(log.block_number, &mut ts_cache)
                .await
                .map_err(|source| IndexError::Discovery { from, to, source })?;
            match self.registry.decode_factory(log, ts) {
                Ok(event) => {
                    if let EventKind::SurveyDeployed { survey, .. } = &event.kind {
                        if known.insert(survey.clone()) {
                            debug!(survey = %survey, block = log.block_number, "discovered survey");
                        }
                    }
                    self.stats.increment("logs_decoded");
                    events.push(event);
                }
                Err(e) => {
                    self.stats.increment("logs_skipped");
                    warn!(block = log.block_number, error = %e, "skipping undecodable factory log");
                }
            }
        }

        // Pass 2: instance events for every known address.
        if !known.is_empty() {
            match self.instance_logs(from, to, known).await {
                Ok(instance_logs) => {
                    for log in &instance_logs {
                        let ts = match self.timestamp_for(log.block_number, &mut ts_cache).await {
                            Ok(ts) => ts,
                            Err(e) => {
                                self.stats.increment("instance_batches_skipped");
                                warn!(from, to, error = %e, "timestamp lookup failed, skipping instance batch");
                                break;
                            }
                        };
                        match self.registry.decode_instance(log, ts) {
                            Ok(event) => {
                                self.stats.increment("logs_decoded");
                                events.push(event);
                            }
                            Err(e) => {
                                self.stats.increment("logs_skipped");
                                warn!(
                                    address = %log.address,
                                    block = log.block_number,
                                    error = %e,
                                    "skipping undecodable instance log"
                                );
                            }
                        }
                    }
                }
                Err(e) => {
                    self.stats.increment("instance_batches_skipped");
                    warn!(from, to, error = %e, "instance queries failed, skipping batch for known addresses");
                }
            }
        }

        events.sort_by_key(DomainEvent::ordering_key);
        Ok(events)
    }

    /// Instance-log query with the filter fallback chain:
    /// multi-address filter → per-address queries → unfiltered range
    /// query filtered locally. Every fallback still only retains logs
    /// from addresses of interest.
    async fn instance_logs(
        &self,
        from: u64,
        to: u64,
        known: &BTreeSet<Address>,
    ) -> Result<Vec<LogEntry>, ChainError> {
        let addresses: Vec<Address> = known.iter().cloned().collect();

        match self.query_with_retry(from, to, &addresses).await {
            Ok(logs) => return Ok(logs),
            Err(e) => {
                self.stats.increment("fallback_queries");
                warn!(from, to, error = %e, "multi-address filter failed, trying per-address queries");
            }
        }

        let mut collected = Vec::new();
        let mut per_address_ok = true;
        for address in &addresses {
            match self
                .query_with_retry(from, to, std::slice::from_ref(address))
                .await
            {
                Ok(mut logs) => collected.append(&mut logs),
                Err(e) => {
                    warn!(address = %address, error = %e, "per-address query failed");
                    per_address_ok = false;
                    break;
                }
            }
        }
        if per_address_ok {
            return Ok(collected);
        }

        self.stats.increment("fallback_queries");
        warn!(from, to, "address filtering unavailable, falling back to unfiltered range query");
        let logs = self.query_with_retry(from, to, &[]).await?;
        Ok(logs
            .into_iter()
            .filter(|log| known.contains(&log.address))
            .collect())
    }

    /// Bounded retries with doubling backoff for transient failures.
    /// Non-transient errors (e.g. filter rejections) surface immediately
    /// so the fallback chain can react.
    async fn query_with_retry(
        &self,
        from: u64,
        to: u64,
        addresses: &[Address],
    ) -> Result<Vec<LogEntry>, ChainError> {
        let mut backoff = self.config.retry_backoff_ms;
        let mut last_err = None;
        for attempt in 1..=self.config.query_attempts {
            match self.ledger.get_logs(from, to, addresses).await {
                Ok(logs) => return Ok(logs),
                Err(e) if e.is_transient() && attempt < self.config.query_attempts => {
                    debug!(from, to, attempt, error = %e, "transient query failure, backing off");
                    tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
                    backoff = backoff.saturating_mul(2);
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| ChainError::Rpc("query attempts exhausted".into())))
    }

    async fn timestamp_for(
        &self,
        height: u64,
        cache: &mut HashMap<u64, Timestamp>,
    ) -> Result<Timestamp, ChainError> {
        if let Some(ts) = cache.get(&height) {
            return Ok(*ts);
        }
        let ts = self.ledger.get_block_timestamp(height).await?;
        cache.insert(height, ts);
        Ok(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_chain::MemoryLedger;
    use tally_crypto::event_topic;
    use tally_events::codec::{pack_words, word_from_address, word_from_u64};
    use tally_events::registry::sig;
    use tally_types::TxHash;

    fn addr(byte: u8) -> Address {
        Address::from_bytes(&[byte; 20])
    }

    fn deploy_log(factory: &Address, survey: &Address, block: u64, index: u64) -> LogEntry {
        LogEntry {
            address: factory.clone(),
            block_number: block,
            log_index: index,
            transaction_hash: TxHash::new([block as u8; 32]),
            topics: vec![event_topic(sig::SURVEY_DEPLOYED_V1)],
            data: pack_words(&[
                word_from_address(survey),
                word_from_address(&addr(0xcc)),
                word_from_u64(100),
                word_from_u64(200),
                word_from_u64(0),
                [0u8; 32],
            ]),
        }
    }

    fn vote_log(survey: &Address, voter: &Address, block: u64, index: u64) -> LogEntry {
        LogEntry {
            address: survey.clone(),
            block_number: block,
            log_index: index,
            transaction_hash: TxHash::new([0x40 + block as u8; 32]),
            topics: vec![event_topic(sig::VOTED)],
            data: pack_words(&[word_from_address(voter)]),
        }
    }

    fn test_config() -> ScanConfig {
        let mut config = ScanConfig::new(addr(0xfa), addr(0xea));
        config.batch_size = 10;
        config.retry_backoff_ms = 1;
        config
    }

    async fn collect_scan(
        ledger: &MemoryLedger,
        config: &ScanConfig,
        cursor: Option<u64>,
        known: &mut BTreeSet<Address>,
    ) -> (Option<u64>, Vec<DomainEvent>) {
        let scanner = Scanner::new(ledger, config);
        let latest = ledger.latest_block_height().await.unwrap();
        let mut all = Vec::new();
        let new_cursor = scanner
            .scan(cursor, latest, known, |_, mut events| {
                all.append(&mut events);
                Ok(())
            })
            .await
            .unwrap();
        (new_cursor, all)
    }

    #[tokio::test]
    async fn discovers_then_scans_instance_in_same_batch() {
        let config = test_config();
        let ledger = MemoryLedger::new();
        let survey = addr(0x01);
        ledger.push_log(deploy_log(&config.factory, &survey, 5, 0));
        ledger.push_log(vote_log(&survey, &addr(0x77), 5, 1));

        let mut known = BTreeSet::new();
        let (cursor, events) = collect_scan(&ledger, &config, None, &mut known).await;

        assert_eq!(cursor, Some(5));
        assert!(known.contains(&survey));
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].kind, EventKind::SurveyDeployed { .. }));
        assert!(matches!(events[1].kind, EventKind::Voted { .. }));
    }

    #[tokio::test]
    async fn events_arrive_in_height_then_index_order() {
        let config = test_config();
        let ledger = MemoryLedger::new();
        let survey = addr(0x01);
        ledger.push_log(deploy_log(&config.factory, &survey, 2, 0));
        ledger.push_log(vote_log(&survey, &addr(0x71), 8, 1));
        ledger.push_log(vote_log(&survey, &addr(0x72), 8, 0));
        ledger.push_log(vote_log(&survey, &addr(0x73), 4, 0));

        let mut known = BTreeSet::new();
        let (_, events) = collect_scan(&ledger, &config, None, &mut known).await;

        let keys: Vec<(u64, u64)> = events.iter().map(DomainEvent::ordering_key).collect();
        assert_eq!(keys, vec![(2, 0), (4, 0), (8, 0), (8, 1)]);
    }

    #[tokio::test]
    async fn cursor_at_tip_is_noop() {
        let config = test_config();
        let ledger = MemoryLedger::new();
        ledger.set_latest(50);

        let mut known = BTreeSet::new();
        let (cursor, events) = collect_scan(&ledger, &config, Some(50), &mut known).await;
        assert_eq!(cursor, None);
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn multi_address_rejection_falls_back_per_address() {
        let config = test_config();
        let ledger = MemoryLedger::new();
        let (s1, s2) = (addr(0x01), addr(0x02));
        ledger.push_log(deploy_log(&config.factory, &s1, 1, 0));
        ledger.push_log(deploy_log(&config.factory, &s2, 1, 1));
        ledger.push_log(vote_log(&s1, &addr(0x71), 2, 0));
        ledger.push_log(vote_log(&s2, &addr(0x72), 2, 1));
        ledger.reject_multi_address_filters(true);

        let mut known = BTreeSet::new();
        let (_, events) = collect_scan(&ledger, &config, None, &mut known).await;

        let votes = events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::Voted { .. }))
            .count();
        assert_eq!(votes, 2);
    }

    #[tokio::test]
    async fn address_filter_rejection_fails_discovery() {
        let config = test_config();
        let ledger = MemoryLedger::new();
        ledger.push_log(deploy_log(&config.factory, &addr(0x01), 1, 0));
        ledger.reject_address_filters(true);

        let scanner = Scanner::new(&ledger, &config);
        let mut known = BTreeSet::new();
        let err = scanner
            .scan(None, 1, &mut known, |_, _| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Discovery { .. }));
    }

    #[tokio::test]
    async fn unfiltered_fallback_retains_only_addresses_of_interest() {
        let config = test_config();
        let ledger = MemoryLedger::new();
        let (s1, s2) = (addr(0x01), addr(0x02));
        let stranger = addr(0x99);
        ledger.push_log(deploy_log(&config.factory, &s1, 1, 0));
        ledger.push_log(deploy_log(&config.factory, &s2, 1, 1));
        ledger.push_log(vote_log(&s1, &addr(0x71), 2, 0));
        ledger.push_log(vote_log(&s2, &addr(0x72), 2, 1));
        ledger.push_log(vote_log(&stranger, &addr(0x73), 2, 2));

        // Multi-address filter rejected and one per-address query failing
        // forces the last-resort unfiltered query.
        ledger.reject_multi_address_filters(true);
        ledger.fail_queries_for_address(s2.clone());

        let mut known = BTreeSet::new();
        let (_, events) = collect_scan(&ledger, &config, None, &mut known).await;

        let voters: Vec<&Address> = events
            .iter()
            .filter_map(|e| match &e.kind {
                EventKind::Voted { voter } => Some(voter),
                _ => None,
            })
            .collect();
        assert_eq!(voters.len(), 2);
        assert!(events.iter().all(|e| e.address != stranger));
    }

    #[tokio::test]
    async fn discovery_failure_is_fatal() {
        let config = test_config();
        let ledger = MemoryLedger::new();
        ledger.push_log(deploy_log(&config.factory, &addr(0x01), 5, 0));
        ledger.fail_queries_touching(5);

        let scanner = Scanner::new(&ledger, &config);
        let mut known = BTreeSet::new();
        let result = scanner.scan(None, 5, &mut known, |_, _| Ok(())).await;
        assert!(matches!(result, Err(IndexError::Discovery { .. })));
    }
}
