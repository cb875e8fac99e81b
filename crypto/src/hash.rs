//! Blake2b hashing and event-topic derivation.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Derive the 32-byte topic identifier for an event schema signature,
/// e.g. `event_topic("SurveyDeployed(address,address,uint64,uint64,uint8,bytes32)")`.
///
/// The schema registry and every log producer (including tests) derive
/// topics through this one function, so the identifier space stays fixed.
pub fn event_topic(signature: &str) -> [u8; 32] {
    blake2b_256(signature.as_bytes())
}
