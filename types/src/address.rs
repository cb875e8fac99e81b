//! Ledger address type — 20 bytes, `0x`-prefixed hex.

use crate::TypeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 20-byte ledger address in canonical form: `0x` + 40 lowercase hex digits.
///
/// Addresses arriving from logs, config, and HTTP requests are case-mixed;
/// parsing normalizes them so the same contract always maps to the same
/// store key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Parse and case-normalize an address string.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let hex_part = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .ok_or_else(|| TypeError::InvalidAddress(raw.to_string()))?;
        if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidAddress(raw.to_string()));
        }
        Ok(Self(format!("0x{}", hex_part.to_ascii_lowercase())))
    }

    /// Build an address from raw bytes (e.g. the low 20 bytes of a log topic).
    pub fn from_bytes(bytes: &[u8; 20]) -> Self {
        let mut s = String::with_capacity(42);
        s.push_str("0x");
        for b in bytes {
            s.push_str(&format!("{b:02x}"));
        }
        Self(s)
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
