//! Typed domain events and log decoding.
//!
//! Raw [`LogEntry`] values become [`DomainEvent`] values through the
//! [`SchemaRegistry`]: an ordered list of candidate decoders per emitting
//! family (factory vs survey instance). Historical schema variants are
//! tried in priority order; the first success wins and the fallback path
//! is logged. A log matching no candidate is skipped, never fatal.
//!
//! [`LogEntry`]: tally_chain::LogEntry

pub mod codec;
pub mod error;
pub mod event;
pub mod registry;

pub use error::DecodeError;
pub use event::{DomainEvent, EventKind};
pub use registry::SchemaRegistry;
