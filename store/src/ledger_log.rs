//! Append-only event ledger.

use crate::StoreError;

/// The external event history: one JSON record per line, strictly
/// append, never rewritten.
pub trait EventLedger {
    fn append_event(&self, record: &serde_json::Value) -> Result<(), StoreError>;
}
