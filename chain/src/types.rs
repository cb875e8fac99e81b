//! Wire types returned by a ledger source.

use serde::{Deserialize, Serialize};
use tally_types::{Address, TokenAmount, TxHash};

/// A raw log entry as emitted by a contract.
///
/// Ordering within the stream is defined by `(block_number, log_index)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogEntry {
    /// Emitting contract address.
    pub address: Address,
    pub block_number: u64,
    /// Position of this log within its block.
    pub log_index: u64,
    pub transaction_hash: TxHash,
    /// Indexed topics; `topics[0]` identifies the event schema.
    pub topics: Vec<[u8; 32]>,
    /// ABI-style word-packed payload.
    pub data: Vec<u8>,
}

impl LogEntry {
    /// The schema-identifying first topic, if present.
    pub fn topic0(&self) -> Option<&[u8; 32]> {
        self.topics.first()
    }
}

/// A transaction as needed by funding verification.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionInfo {
    pub hash: TxHash,
    pub from: Address,
    /// `None` for contract-creation transactions.
    pub to: Option<Address>,
    pub value: TokenAmount,
}

/// A transaction receipt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReceiptInfo {
    /// Whether the transaction executed successfully.
    pub status: bool,
    /// Block the transaction was included in.
    pub block_number: u64,
}
