//! File-backed JSON store.
//!
//! One JSON document per store family under a data directory, loaded at
//! open, flushed by write-temp-then-rename so a consumer (or a crashed
//! process) never observes a partial write. The event ledger is a
//! separate newline-delimited file opened in append mode.

mod files;

pub use files::{atomic_write, JsonStore};
