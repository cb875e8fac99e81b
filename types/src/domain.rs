//! Structured-data signing domain descriptor.

use crate::Address;
use serde::{Deserialize, Serialize};

/// The named, versioned, chain-bound context that scopes an eligibility
/// signature to one verifying contract and chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl SigningDomain {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: Address,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        }
    }

    /// The same domain bound to a different verifying contract.
    pub fn with_verifying_contract(&self, verifying_contract: Address) -> Self {
        Self {
            verifying_contract,
            ..self.clone()
        }
    }
}
