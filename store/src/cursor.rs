//! Scan checkpoint storage.

use crate::StoreError;

/// The highest block height whose events have been fully and durably
/// folded into the entity store.
///
/// Read at startup, advanced monotonically after each fully-processed
/// batch, never decremented except by manual reset (out of band).
pub trait CursorStore {
    /// Current cursor, `None` before the first completed batch.
    fn cursor(&self) -> Result<Option<u64>, StoreError>;

    fn set_cursor(&self, height: u64) -> Result<(), StoreError>;
}
