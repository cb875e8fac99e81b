//! In-memory ledger — thread-safe test double for the scan pipeline.

use crate::types::{LogEntry, ReceiptInfo, TransactionInfo};
use crate::{ChainError, LedgerSource};

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tally_types::{Address, Timestamp, TokenAmount, TxHash};

/// An in-memory ledger for tests.
///
/// Supports fault injection: rejecting multi-address filters (to exercise
/// the scanner's per-address fallback), rejecting address filtering
/// entirely (to exercise the unfiltered fallback), and failing queries
/// that touch specific heights (to exercise batch-skip handling).
#[derive(Default)]
pub struct MemoryLedger {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    latest: u64,
    logs: Vec<LogEntry>,
    block_timestamps: HashMap<u64, Timestamp>,
    transactions: HashMap<TxHash, TransactionInfo>,
    receipts: HashMap<TxHash, ReceiptInfo>,
    balances: HashMap<Address, TokenAmount>,
    reject_multi_address: bool,
    reject_address_filter: bool,
    failing_address: Option<Address>,
    failing_heights: HashSet<u64>,
    failure_exempt_address: Option<Address>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_latest(&self, height: u64) {
        self.inner.lock().unwrap().latest = height;
    }

    pub fn push_log(&self, log: LogEntry) {
        let mut inner = self.inner.lock().unwrap();
        inner.latest = inner.latest.max(log.block_number);
        inner
            .block_timestamps
            .entry(log.block_number)
            .or_insert_with(|| Timestamp::new(log.block_number * 10));
        inner.logs.push(log);
    }

    pub fn set_block_timestamp(&self, height: u64, ts: Timestamp) {
        self.inner.lock().unwrap().block_timestamps.insert(height, ts);
    }

    pub fn put_transaction(&self, tx: TransactionInfo, receipt: ReceiptInfo) {
        let mut inner = self.inner.lock().unwrap();
        inner.receipts.insert(tx.hash, receipt);
        inner.transactions.insert(tx.hash, tx);
    }

    pub fn set_balance(&self, address: Address, balance: TokenAmount) {
        self.inner.lock().unwrap().balances.insert(address, balance);
    }

    /// Make multi-address filters fail (single-address still works).
    pub fn reject_multi_address_filters(&self, reject: bool) {
        self.inner.lock().unwrap().reject_multi_address = reject;
    }

    /// Make every address-filtered query fail (unfiltered still works).
    pub fn reject_address_filters(&self, reject: bool) {
        self.inner.lock().unwrap().reject_address_filter = reject;
    }

    /// Fail any single-address query for exactly `address`.
    pub fn fail_queries_for_address(&self, address: Address) {
        self.inner.lock().unwrap().failing_address = Some(address);
    }

    /// Fail any log query whose range includes `height`.
    pub fn fail_queries_touching(&self, height: u64) {
        self.inner.lock().unwrap().failing_heights.insert(height);
    }

    /// Exempt single-address queries for `address` from injected range
    /// failures (lets one emitter stay queryable while others fail).
    pub fn set_failure_exempt_address(&self, address: Address) {
        self.inner.lock().unwrap().failure_exempt_address = Some(address);
    }
}

impl LedgerSource for MemoryLedger {
    async fn latest_block_height(&self) -> Result<u64, ChainError> {
        Ok(self.inner.lock().unwrap().latest)
    }

    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        addresses: &[Address],
    ) -> Result<Vec<LogEntry>, ChainError> {
        let inner = self.inner.lock().unwrap();
        if inner.failing_heights.iter().any(|&h| from <= h && h <= to) {
            let exempt = matches!(
                (&inner.failure_exempt_address, addresses),
                (Some(a), [single]) if a == single
            );
            if !exempt {
                return Err(ChainError::Unreachable("injected range failure".into()));
            }
        }
        if !addresses.is_empty() && inner.reject_address_filter {
            return Err(ChainError::Rpc("address filter not supported".into()));
        }
        if addresses.len() > 1 && inner.reject_multi_address {
            return Err(ChainError::Rpc("multi-address filter not supported".into()));
        }
        if let (Some(failing), [single]) = (&inner.failing_address, addresses) {
            if failing == single {
                return Err(ChainError::Rpc("injected address failure".into()));
            }
        }
        let mut logs: Vec<LogEntry> = inner
            .logs
            .iter()
            .filter(|log| log.block_number >= from && log.block_number <= to)
            .filter(|log| addresses.is_empty() || addresses.contains(&log.address))
            .cloned()
            .collect();
        logs.sort_by_key(|log| (log.block_number, log.log_index));
        Ok(logs)
    }

    async fn get_block_timestamp(&self, height: u64) -> Result<Timestamp, ChainError> {
        self.inner
            .lock()
            .unwrap()
            .block_timestamps
            .get(&height)
            .copied()
            .ok_or_else(|| ChainError::InvalidResponse(format!("unknown block {height}")))
    }

    async fn get_transaction(&self, hash: &TxHash) -> Result<Option<TransactionInfo>, ChainError> {
        Ok(self.inner.lock().unwrap().transactions.get(hash).cloned())
    }

    async fn get_receipt(&self, hash: &TxHash) -> Result<Option<ReceiptInfo>, ChainError> {
        Ok(self.inner.lock().unwrap().receipts.get(hash).cloned())
    }

    async fn get_balance(&self, address: &Address) -> Result<TokenAmount, ChainError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .balances
            .get(address)
            .copied()
            .unwrap_or(TokenAmount::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes(&[byte; 20])
    }

    fn log_at(address: Address, block: u64, index: u64) -> LogEntry {
        LogEntry {
            address,
            block_number: block,
            log_index: index,
            transaction_hash: TxHash::new([block as u8; 32]),
            topics: vec![],
            data: vec![],
        }
    }

    #[tokio::test]
    async fn filters_by_range_and_address() {
        let ledger = MemoryLedger::new();
        ledger.push_log(log_at(addr(1), 5, 0));
        ledger.push_log(log_at(addr(2), 6, 0));
        ledger.push_log(log_at(addr(1), 20, 0));

        let logs = ledger.get_logs(1, 10, &[addr(1)]).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].block_number, 5);
    }

    #[tokio::test]
    async fn logs_sorted_by_height_then_index() {
        let ledger = MemoryLedger::new();
        ledger.push_log(log_at(addr(1), 7, 1));
        ledger.push_log(log_at(addr(1), 5, 0));
        ledger.push_log(log_at(addr(1), 7, 0));

        let logs = ledger.get_logs(0, 100, &[]).await.unwrap();
        let order: Vec<(u64, u64)> = logs.iter().map(|l| (l.block_number, l.log_index)).collect();
        assert_eq!(order, vec![(5, 0), (7, 0), (7, 1)]);
    }

    #[tokio::test]
    async fn multi_address_rejection() {
        let ledger = MemoryLedger::new();
        ledger.reject_multi_address_filters(true);
        ledger.push_log(log_at(addr(1), 1, 0));

        assert!(ledger.get_logs(0, 10, &[addr(1), addr(2)]).await.is_err());
        assert!(ledger.get_logs(0, 10, &[addr(1)]).await.is_ok());
    }

    #[tokio::test]
    async fn injected_range_failure() {
        let ledger = MemoryLedger::new();
        ledger.set_latest(100);
        ledger.fail_queries_touching(50);

        assert!(ledger.get_logs(40, 60, &[]).await.is_err());
        assert!(ledger.get_logs(60, 80, &[]).await.is_ok());
    }
}
