//! Daemon configuration with TOML file support.
//!
//! A config file is the base; CLI flags and environment variables
//! override it. Validation of the required values happens per
//! subcommand, before any state is touched.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tally_types::{Address, SigningDomain};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Ledger JSON-RPC endpoint.
    #[serde(default = "default_endpoint")]
    pub ledger_endpoint: String,

    /// Factory/registry contract address (required for indexing).
    #[serde(default)]
    pub factory: Option<String>,

    /// Treasury address (required for indexing).
    #[serde(default)]
    pub treasury: Option<String>,

    /// Data directory for the JSON store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Base URL for metadata documents (`{base}/{address}.json`).
    #[serde(default)]
    pub metadata_base_url: Option<String>,

    /// Downstream admin API to push snapshots to.
    #[serde(default)]
    pub downstream_url: Option<String>,

    #[serde(default)]
    pub start_floor: u64,

    #[serde(default)]
    pub tail_window: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    #[serde(default = "default_min_confirmations")]
    pub min_confirmations: u64,

    /// Attestation service port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Hex-encoded Ed25519 signer seed (required for serving).
    #[serde(default)]
    pub signer_key: Option<String>,

    #[serde(default = "default_k_anonymity")]
    pub k_anonymity: u32,

    // Signing domain.
    #[serde(default = "default_domain_name")]
    pub domain_name: String,

    #[serde(default = "default_domain_version")]
    pub domain_version: String,

    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Gate contract the eligibility signatures are scoped to.
    /// Falls back to the factory address when unset.
    #[serde(default)]
    pub verifying_contract: Option<String>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_endpoint() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./tally_data")
}

fn default_batch_size() -> u64 {
    500
}

fn default_min_confirmations() -> u64 {
    6
}

fn default_port() -> u16 {
    8788
}

fn default_k_anonymity() -> u32 {
    5
}

fn default_domain_name() -> String {
    "TallyGate".to_string()
}

fn default_domain_version() -> String {
    "1".to_string()
}

fn default_chain_id() -> u64 {
    1
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DaemonConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// The factory address, validated. Fatal when missing or malformed.
    pub fn factory_address(&self) -> anyhow::Result<Address> {
        let raw = self
            .factory
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("missing required config value: factory"))?;
        Ok(Address::parse(raw)?)
    }

    /// The treasury address, validated.
    pub fn treasury_address(&self) -> anyhow::Result<Address> {
        let raw = self
            .treasury
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("missing required config value: treasury"))?;
        Ok(Address::parse(raw)?)
    }

    /// The signing domain, with the verifying contract falling back to
    /// the factory address.
    pub fn signing_domain(&self) -> anyhow::Result<SigningDomain> {
        let contract = match (&self.verifying_contract, &self.factory) {
            (Some(raw), _) | (None, Some(raw)) => Address::parse(raw)?,
            (None, None) => anyhow::bail!(
                "missing required config value: verifying_contract (or factory)"
            ),
        };
        Ok(SigningDomain::new(
            self.domain_name.clone(),
            self.domain_version.clone(),
            self.chain_id,
            contract,
        ))
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            ledger_endpoint: default_endpoint(),
            factory: None,
            treasury: None,
            data_dir: default_data_dir(),
            metadata_base_url: None,
            downstream_url: None,
            start_floor: 0,
            tail_window: 0,
            batch_size: default_batch_size(),
            min_confirmations: default_min_confirmations(),
            port: default_port(),
            signer_key: None,
            k_anonymity: default_k_anonymity(),
            domain_name: default_domain_name(),
            domain_version: default_domain_version(),
            chain_id: default_chain_id(),
            verifying_contract: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = DaemonConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.port, 8788);
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.k_anonymity, 5);
        assert_eq!(config.domain_name, "TallyGate");
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            port = 9999
            batch_size = 50
            factory = "0xabcdef0123456789abcdef0123456789abcdef01"
        "#;
        let config = DaemonConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.port, 9999);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.min_confirmations, 6); // default
        assert!(config.factory_address().is_ok());
    }

    #[test]
    fn missing_factory_is_fatal_for_indexing() {
        let config = DaemonConfig::default();
        assert!(config.factory_address().is_err());
        assert!(config.treasury_address().is_err());
    }

    #[test]
    fn malformed_factory_is_fatal() {
        let mut config = DaemonConfig::default();
        config.factory = Some("0x12".into());
        assert!(config.factory_address().is_err());
    }

    #[test]
    fn signing_domain_falls_back_to_factory() {
        let mut config = DaemonConfig::default();
        config.factory = Some("0xabcdef0123456789abcdef0123456789abcdef01".into());
        let domain = config.signing_domain().unwrap();
        assert_eq!(
            domain.verifying_contract.as_str(),
            "0xabcdef0123456789abcdef0123456789abcdef01"
        );

        config.verifying_contract = Some("0x1111111111111111111111111111111111111111".into());
        let domain = config.signing_domain().unwrap();
        assert_eq!(
            domain.verifying_contract.as_str(),
            "0x1111111111111111111111111111111111111111"
        );
    }
}
