use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    /// Transport-level failure (timeout, refused connection). Retryable.
    #[error("ledger endpoint unreachable: {0}")]
    Unreachable(String),

    /// The endpoint answered with an error (including filter rejections).
    #[error("ledger RPC error: {0}")]
    Rpc(String),

    /// The endpoint answered with something unparseable.
    #[error("invalid ledger response: {0}")]
    InvalidResponse(String),
}

impl ChainError {
    /// Whether a retry with the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}
