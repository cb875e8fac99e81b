use tally_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid survey address: {0}")]
    InvalidSurvey(String),

    #[error("invalid nullifier: {0}")]
    InvalidNullifier(String),

    #[error("unknown schema kind: {0}")]
    UnknownSchema(String),

    #[error("missing or malformed field: {0}")]
    InvalidField(&'static str),

    #[error("birth date is under the minimum age")]
    Underage,

    #[error("unknown country code: {0}")]
    UnknownCountry(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IngestError {
    /// Whether the error is the submitter's fault (client-visible 4xx).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}
