//! The attestation ingest service.
//!
//! Third parties submit proof-derived fields for a pseudonym. The service
//! derives at most one coarse field per submission, deduplicates by
//! nullifier (re-submitting the same proof content never double-counts),
//! and folds the resulting delta into per-survey aggregate rows.
//! Concurrent submissions for the same nullifier are serialized through a
//! keyed lock; distinct nullifiers proceed independently.

pub mod delta;
pub mod error;
pub mod ingest;
pub mod locks;
pub mod schema;

pub use delta::{AppliedDelta, RowDelta};
pub use error::IngestError;
pub use ingest::{AggregateSnapshot, IngestService, SubmitOutcome};
pub use locks::KeyedLocks;
pub use schema::{derive_field, DerivedField, SchemaKind};
