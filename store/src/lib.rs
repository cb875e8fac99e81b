//! Abstract storage traits for Tally.
//!
//! The pipeline and the ingest service depend only on these traits; the
//! abstraction, not the storage medium, is the contract. `MemoryStore`
//! backs tests and the ingest hot path, `tally-store-json` backs the
//! batch pipeline with atomic-replace publishing.

pub mod aggregate;
pub mod balance;
pub mod cursor;
pub mod error;
pub mod funding;
pub mod ledger_log;
pub mod marks;
pub mod memory;
pub mod person;
pub mod snapshot;
pub mod survey;

pub use aggregate::{AggregateKey, AggregateRow, AggregateStore};
pub use balance::BalanceStore;
pub use cursor::CursorStore;
pub use error::StoreError;
pub use funding::{FundingClaim, FundingQueueStore};
pub use ledger_log::EventLedger;
pub use marks::{AppliedMarkStore, VoteMarkStore};
pub use memory::MemoryStore;
pub use person::{Person, PersonStore};
pub use snapshot::{Snapshot, SnapshotSink, StateDescriptor, SurveySummary};
pub use survey::{SurveyRecord, SurveyStore};
