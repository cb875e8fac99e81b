//! The Ledger Log Source capability.
//!
//! Everything the indexer knows about the chain flows through the
//! [`LedgerSource`] trait: log range queries, block timestamps,
//! transaction/receipt lookups, and live balances. The pipeline depends
//! only on the trait; `JsonRpcLedger` is the production transport and
//! `MemoryLedger` the test double.

pub mod error;
pub mod memory;
pub mod rpc;
pub mod types;

pub use error::ChainError;
pub use memory::MemoryLedger;
pub use rpc::JsonRpcLedger;
pub use types::{LogEntry, ReceiptInfo, TransactionInfo};

use tally_types::{Address, Timestamp, TokenAmount, TxHash};

/// Read-only capability over an append-only event ledger.
///
/// All calls are pure reads, bounded by a transport timeout, and safe to
/// retry.
pub trait LedgerSource {
    /// Height of the most recent block.
    fn latest_block_height(&self) -> impl std::future::Future<Output = Result<u64, ChainError>> + Send;

    /// Logs in `[from, to]` (inclusive), filtered to `addresses`.
    /// An empty address slice means unfiltered.
    fn get_logs(
        &self,
        from: u64,
        to: u64,
        addresses: &[Address],
    ) -> impl std::future::Future<Output = Result<Vec<LogEntry>, ChainError>> + Send;

    /// Timestamp of the block at `height` (normalized to seconds).
    fn get_block_timestamp(
        &self,
        height: u64,
    ) -> impl std::future::Future<Output = Result<Timestamp, ChainError>> + Send;

    /// Transaction by hash, if known.
    fn get_transaction(
        &self,
        hash: &TxHash,
    ) -> impl std::future::Future<Output = Result<Option<TransactionInfo>, ChainError>> + Send;

    /// Receipt by transaction hash, if known.
    fn get_receipt(
        &self,
        hash: &TxHash,
    ) -> impl std::future::Future<Output = Result<Option<ReceiptInfo>, ChainError>> + Send;

    /// Current balance of `address`.
    fn get_balance(
        &self,
        address: &Address,
    ) -> impl std::future::Future<Output = Result<TokenAmount, ChainError>> + Send;
}
