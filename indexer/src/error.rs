use tally_chain::ChainError;
use tally_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Discovery-pass failure after retries; fatal for the invocation so
    /// the cursor never advances past undiscovered survey addresses.
    #[error("discovery scan failed for blocks {from}..={to}: {source}")]
    Discovery {
        from: u64,
        to: u64,
        source: ChainError,
    },

    #[error("metadata source error: {0}")]
    Metadata(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
