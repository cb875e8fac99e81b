//! Ed25519 key generation and loading.

use crate::CryptoError;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use tally_types::{KeyPair, PrivateKey, PublicKey};

/// Generate a new Ed25519 key pair from a secure random source.
pub fn generate_keypair() -> KeyPair {
    let signing_key = SigningKey::generate(&mut OsRng);
    let verifying_key = signing_key.verifying_key();
    KeyPair {
        public: PublicKey(verifying_key.to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

/// Derive the public key from a private key.
pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    let signing_key = SigningKey::from_bytes(&private.0);
    PublicKey(signing_key.verifying_key().to_bytes())
}

/// Reconstruct a full key pair from a private key.
pub fn keypair_from_private(private: PrivateKey) -> KeyPair {
    let public = public_from_private(&private);
    KeyPair { public, private }
}

/// Derive a key pair from a 32-byte seed (deterministic).
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    let signing_key = SigningKey::from_bytes(seed);
    let verifying_key = signing_key.verifying_key();
    KeyPair {
        public: PublicKey(verifying_key.to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

/// Parse a private key from a 64-hex-digit string (with or without `0x`).
///
/// Used to load the signer key from config or environment.
pub fn private_key_from_hex(raw: &str) -> Result<PrivateKey, CryptoError> {
    let hex_part = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(hex_part).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKey("expected 32 bytes".to_string()))?;
    Ok(PrivateKey(arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_valid_keypair() {
        let kp = generate_keypair();
        assert_ne!(kp.public.0, [0u8; 32]);
    }

    #[test]
    fn public_from_private_is_deterministic() {
        let kp = generate_keypair();
        let pub2 = public_from_private(&kp.private);
        assert_eq!(kp.public.0, pub2.0);
    }

    #[test]
    fn keypair_from_seed_deterministic() {
        let seed = [42u8; 32];
        let kp1 = keypair_from_seed(&seed);
        let kp2 = keypair_from_seed(&seed);
        assert_eq!(kp1.public.0, kp2.public.0);
        assert_eq!(kp1.private.0, kp2.private.0);
    }

    #[test]
    fn different_seeds_produce_different_keys() {
        let kp1 = keypair_from_seed(&[1u8; 32]);
        let kp2 = keypair_from_seed(&[2u8; 32]);
        assert_ne!(kp1.public.0, kp2.public.0);
    }

    #[test]
    fn private_key_from_hex_roundtrip() {
        let kp = keypair_from_seed(&[7u8; 32]);
        let hex_str = format!("0x{}", hex::encode(kp.private.0));
        let loaded = private_key_from_hex(&hex_str).unwrap();
        assert_eq!(loaded.0, kp.private.0);
    }

    #[test]
    fn private_key_from_hex_rejects_short() {
        assert!(private_key_from_hex("0xabcd").is_err());
    }
}
