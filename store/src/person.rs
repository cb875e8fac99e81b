//! Pseudonymous person storage.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use tally_types::{Address, AgeBucket, Nullifier, Region};

/// One pseudonymous identity, keyed by nullifier.
///
/// Holds only coarse derived fields. Created on the first submission
/// bearing a given nullifier; refined in place by later submissions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub nullifier: Nullifier,
    /// The survey whose aggregation scope this nullifier belongs to,
    /// recorded at creation.
    pub survey: Address,
    pub age_bucket: Option<AgeBucket>,
    pub region: Option<Region>,
    /// ISO 3166-1 alpha-2, upper-case.
    pub country: Option<String>,
    pub verified: bool,
}

impl Person {
    pub fn new(nullifier: Nullifier, survey: Address) -> Self {
        Self {
            nullifier,
            survey,
            age_bucket: None,
            region: None,
            country: None,
            verified: false,
        }
    }
}

/// Trait for person storage.
pub trait PersonStore {
    fn get_person(&self, nullifier: &Nullifier) -> Result<Option<Person>, StoreError>;
    fn put_person(&self, person: &Person) -> Result<(), StoreError>;
    /// Number of distinct nullifiers ever seen.
    fn person_count(&self) -> Result<u64, StoreError>;
}
