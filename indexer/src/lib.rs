//! The incremental log-indexing pipeline.
//!
//! One cycle drives: checkpointed scan (two-pass discovery) → decode →
//! reduce into the entity store → enrichment (metadata join, funding
//! verification, balance refresh) → snapshot publish. The pipeline runs
//! as a single sequential batch job per invocation; batches are
//! processed in strictly increasing height order and the cursor only
//! advances after a batch is durably folded in.

pub mod config;
pub mod enrich;
pub mod error;
pub mod pipeline;
pub mod publish;
pub mod reduce;
pub mod scanner;

pub use config::ScanConfig;
pub use enrich::{
    document_hash, Enricher, MemoryMetadataSource, MetadataDoc, MetadataSource, WebMetadataSource,
};
pub use error::IndexError;
pub use pipeline::{CycleReport, Pipeline};
pub use publish::{build_snapshot, DownstreamPusher};
pub use reduce::reduce;
pub use scanner::Scanner;

use tally_store::{
    AppliedMarkStore, BalanceStore, CursorStore, EventLedger, FundingQueueStore, SnapshotSink,
    SurveyStore, VoteMarkStore,
};

/// Everything the batch pipeline needs from a storage backend.
pub trait EntityStore:
    CursorStore
    + SurveyStore
    + BalanceStore
    + VoteMarkStore
    + AppliedMarkStore
    + FundingQueueStore
    + EventLedger
    + SnapshotSink
{
}

impl<T> EntityStore for T where
    T: CursorStore
        + SurveyStore
        + BalanceStore
        + VoteMarkStore
        + AppliedMarkStore
        + FundingQueueStore
        + EventLedger
        + SnapshotSink
{
}
