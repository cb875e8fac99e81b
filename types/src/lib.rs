//! Fundamental types for the Tally system.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: ledger addresses, hashes, pseudonyms, token amounts,
//! timestamps, survey lifecycle status, and signing key material.

pub mod address;
pub mod amount;
pub mod demographics;
pub mod domain;
pub mod error;
pub mod hash;
pub mod keys;
pub mod pseudonym;
pub mod status;
pub mod time;

pub use address::Address;
pub use amount::TokenAmount;
pub use demographics::{AgeBucket, Region};
pub use domain::SigningDomain;
pub use error::TypeError;
pub use hash::{ContentHash, TxHash};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use pseudonym::Nullifier;
pub use status::SurveyStatus;
pub use time::Timestamp;
