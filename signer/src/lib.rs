//! The eligibility signer.
//!
//! Produces a deterministic, expiring, domain-separated attestation over
//! `(subject, survey, nullifier, expiry, chainId)`. The signature, the
//! domain, and the type schema are returned together so a verifier can
//! independently re-derive the digest. Stateless: a pure function of the
//! request plus the process-held key.

pub mod digest;
pub mod error;
pub mod sign;

pub use digest::{assertion_digest, domain_separator, type_schema, ASSERTION_TYPE};
pub use error::SignError;
pub use sign::{EligibilitySigner, SignRequest, SignedAssertion};
