//! 32-byte hash types for transactions and content bindings.

use crate::TypeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

macro_rules! hash32 {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Parse from `0x` + 64 hex digits.
            pub fn parse(raw: &str) -> Result<Self, TypeError> {
                let hex_part = raw
                    .strip_prefix("0x")
                    .ok_or_else(|| TypeError::InvalidHash(raw.to_string()))?;
                if hex_part.len() != 64 {
                    return Err(TypeError::InvalidHash(raw.to_string()));
                }
                let mut bytes = [0u8; 32];
                for (i, byte) in bytes.iter_mut().enumerate() {
                    *byte = u8::from_str_radix(&hex_part[2 * i..2 * i + 2], 16)
                        .map_err(|_| TypeError::InvalidHash(raw.to_string()))?;
                }
                Ok(Self(bytes))
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }

            fn to_hex(&self) -> String {
                let mut s = String::with_capacity(66);
                s.push_str("0x");
                for b in &self.0 {
                    s.push_str(&format!("{b:02x}"));
                }
                s
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({}…)"), &self.to_hex()[..10])
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

hash32!(TxHash, "A 32-byte transaction hash.");
hash32!(
    ContentHash,
    "A 32-byte content hash binding off-chain metadata (or finalize-time rules/results) to a record."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        let h = TxHash::new([0xcd; 32]);
        assert_eq!(TxHash::parse(&h.to_string()).unwrap(), h);
    }

    #[test]
    fn rejects_bad_length() {
        assert!(TxHash::parse("0xabcd").is_err());
    }

    #[test]
    fn rejects_missing_prefix() {
        let hex: String = std::iter::repeat('a').take(64).collect();
        assert!(ContentHash::parse(&hex).is_err());
    }

    #[test]
    fn is_zero() {
        assert!(TxHash::ZERO.is_zero());
        assert!(!TxHash::new([1; 32]).is_zero());
    }

    #[test]
    fn serde_as_hex_string() {
        let h = ContentHash::new([0x11; 32]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(
            json,
            "\"0x1111111111111111111111111111111111111111111111111111111111111111\""
        );
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
