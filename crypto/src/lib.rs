//! Cryptographic primitives for Tally.
//!
//! Blake2b-256 digests (event topic derivation, metadata integrity,
//! structured signing digests) and Ed25519 key handling for the
//! eligibility signer.

pub mod error;
pub mod hash;
pub mod keys;
pub mod sign;

pub use error::CryptoError;
pub use hash::{blake2b_256, blake2b_256_multi, event_topic};
pub use keys::{
    generate_keypair, keypair_from_private, keypair_from_seed, private_key_from_hex,
    public_from_private,
};
pub use sign::{sign_message, verify_signature};
