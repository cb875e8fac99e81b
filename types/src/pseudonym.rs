//! Pseudonymous identity type (nullifier).

use crate::TypeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An opaque 32-byte pseudonym derived from an identity proof.
///
/// A nullifier uniquely but anonymously represents one real-world identity
/// within a survey's aggregation scope. It is the only identity key the
/// system ever persists.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Nullifier([u8; 32]);

impl Nullifier {
    /// The expected wire form: `0x` followed by 64 hex digits.
    pub const HEX_LEN: usize = 66;

    /// Parse from the fixed-length hex wire form.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let hex_part = raw
            .strip_prefix("0x")
            .ok_or_else(|| TypeError::InvalidNullifier(raw.len()))?;
        if hex_part.len() != 64 {
            return Err(TypeError::InvalidNullifier(raw.len()));
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex_part[2 * i..2 * i + 2], 16)
                .map_err(|_| TypeError::InvalidNullifier(raw.len()))?;
        }
        Ok(Self(bytes))
    }

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        let mut s = String::with_capacity(Self::HEX_LEN);
        s.push_str("0x");
        for b in &self.0 {
            s.push_str(&format!("{b:02x}"));
        }
        s
    }
}

// Display deliberately truncates: full nullifiers do not belong in logs.
impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}…", &self.to_hex()[..10])
    }
}

impl fmt::Debug for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nullifier({self})")
    }
}

impl Serialize for Nullifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Nullifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
