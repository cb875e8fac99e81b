//! Token amount type.
//!
//! Amounts are raw integer units (u128) to avoid floating-point errors.
//! JSON serialization uses decimal strings so downstream JavaScript
//! consumers never lose precision.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Add;

/// A token amount in raw units (u128).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Add for TokenAmount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl serde::de::Visitor<'_> for AmountVisitor {
            type Value = TokenAmount;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a decimal string or integer amount")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse::<u128>()
                    .map(TokenAmount)
                    .map_err(|_| E::custom(format!("invalid amount: {v}")))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(TokenAmount(v as u128))
            }

            fn visit_u128<E: serde::de::Error>(self, v: u128) -> Result<Self::Value, E> {
                Ok(TokenAmount(v))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_decimal_string() {
        let a = TokenAmount::new(340_282_366_920_938_463_463);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            "\"340282366920938463463\""
        );
    }

    #[test]
    fn deserializes_from_string_or_integer() {
        let from_str: TokenAmount = serde_json::from_str("\"1000\"").unwrap();
        let from_int: TokenAmount = serde_json::from_str("1000").unwrap();
        assert_eq!(from_str, from_int);
        assert_eq!(from_str.raw(), 1000);
    }

    #[test]
    fn checked_add_overflow_is_none() {
        let max = TokenAmount::new(u128::MAX);
        assert!(max.checked_add(TokenAmount::new(1)).is_none());
    }

    #[test]
    fn rejects_negative_string() {
        let result: Result<TokenAmount, _> = serde_json::from_str("\"-5\"");
        assert!(result.is_err());
    }
}
