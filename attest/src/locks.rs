//! Per-key async locking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tally_types::Nullifier;

/// A registry of per-nullifier async mutexes.
///
/// Read-modify-write on a person must be atomic per nullifier; distinct
/// nullifiers proceed fully concurrently. Guards are created lazily and
/// kept for the life of the service (the key space is bounded by the
/// number of distinct submitters).
#[derive(Default)]
pub struct KeyedLocks {
    inner: Mutex<HashMap<Nullifier, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `key`, creating it on first use.
    pub fn lock_for(&self, key: &Nullifier) -> Arc<tokio::sync::Mutex<()>> {
        self.inner
            .lock()
            .unwrap()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
