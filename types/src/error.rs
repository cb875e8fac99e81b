//! Validation errors for core types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypeError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid nullifier length: {0} (expected 0x + 64 hex digits)")]
    InvalidNullifier(usize),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}
