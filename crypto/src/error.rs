use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key material: {0}")]
    InvalidKey(String),
}
