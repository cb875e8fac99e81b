use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("invalid subject address: {0}")]
    InvalidSubject(String),

    #[error("invalid survey address: {0}")]
    InvalidSurvey(String),

    #[error("invalid nullifier: {0}")]
    InvalidNullifier(String),

    #[error("expiry must be strictly in the future")]
    ExpiryNotInFuture,
}
