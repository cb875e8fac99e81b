//! Structured-data digest construction.
//!
//! The digest binds a fixed field schema to a named, versioned,
//! chain-bound domain. Every part is length-independent because fields
//! are fed to the hash as discrete segments with a leading protocol tag,
//! so no two field combinations collide by concatenation.

use tally_crypto::blake2b_256_multi;
use tally_types::{Address, Nullifier, SigningDomain, Timestamp};

/// The assertion's type signature, part of the digest preimage and of
/// the published schema.
pub const ASSERTION_TYPE: &str =
    "EligibilityAssertion(address subject,address survey,bytes32 nullifier,uint64 expiry,uint64 chainId)";

/// Protocol tag separating these digests from any other signed payload.
const PROTOCOL_TAG: &[u8] = b"\x19TALLY-ELIGIBILITY-V1";

/// Hash of the domain fields.
pub fn domain_separator(domain: &SigningDomain) -> [u8; 32] {
    blake2b_256_multi(&[
        b"TallyDomain(string name,string version,uint64 chainId,address verifyingContract)",
        domain.name.as_bytes(),
        domain.version.as_bytes(),
        &domain.chain_id.to_be_bytes(),
        domain.verifying_contract.as_str().as_bytes(),
    ])
}

/// The digest that gets signed.
pub fn assertion_digest(
    domain: &SigningDomain,
    subject: &Address,
    survey: &Address,
    nullifier: &Nullifier,
    expiry: Timestamp,
) -> [u8; 32] {
    let type_hash = tally_crypto::blake2b_256(ASSERTION_TYPE.as_bytes());
    blake2b_256_multi(&[
        PROTOCOL_TAG,
        &domain_separator(domain),
        &type_hash,
        subject.as_str().as_bytes(),
        survey.as_str().as_bytes(),
        nullifier.as_bytes(),
        &expiry.as_secs().to_be_bytes(),
        &domain.chain_id.to_be_bytes(),
    ])
}

/// The published type schema, returned with every signature so callers
/// can re-derive the digest.
pub fn type_schema() -> serde_json::Value {
    serde_json::json!({
        "EligibilityAssertion": [
            { "name": "subject", "type": "address" },
            { "name": "survey", "type": "address" },
            { "name": "nullifier", "type": "bytes32" },
            { "name": "expiry", "type": "uint64" },
            { "name": "chainId", "type": "uint64" },
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> SigningDomain {
        SigningDomain::new("Tally", "1", 31337, Address::from_bytes(&[0xde; 20]))
    }

    fn base_digest() -> [u8; 32] {
        assertion_digest(
            &domain(),
            &Address::from_bytes(&[1; 20]),
            &Address::from_bytes(&[2; 20]),
            &Nullifier::new([3; 32]),
            Timestamp::new(2_000_000_000),
        )
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(base_digest(), base_digest());
    }

    #[test]
    fn every_field_changes_the_digest() {
        let base = base_digest();

        let changed_subject = assertion_digest(
            &domain(),
            &Address::from_bytes(&[9; 20]),
            &Address::from_bytes(&[2; 20]),
            &Nullifier::new([3; 32]),
            Timestamp::new(2_000_000_000),
        );
        assert_ne!(base, changed_subject);

        let changed_survey = assertion_digest(
            &domain(),
            &Address::from_bytes(&[1; 20]),
            &Address::from_bytes(&[9; 20]),
            &Nullifier::new([3; 32]),
            Timestamp::new(2_000_000_000),
        );
        assert_ne!(base, changed_survey);

        let changed_nullifier = assertion_digest(
            &domain(),
            &Address::from_bytes(&[1; 20]),
            &Address::from_bytes(&[2; 20]),
            &Nullifier::new([9; 32]),
            Timestamp::new(2_000_000_000),
        );
        assert_ne!(base, changed_nullifier);

        let changed_expiry = assertion_digest(
            &domain(),
            &Address::from_bytes(&[1; 20]),
            &Address::from_bytes(&[2; 20]),
            &Nullifier::new([3; 32]),
            Timestamp::new(2_000_000_001),
        );
        assert_ne!(base, changed_expiry);
    }

    #[test]
    fn domain_scopes_the_digest() {
        let other_chain = SigningDomain::new("Tally", "1", 1, Address::from_bytes(&[0xde; 20]));
        let digest = assertion_digest(
            &other_chain,
            &Address::from_bytes(&[1; 20]),
            &Address::from_bytes(&[2; 20]),
            &Nullifier::new([3; 32]),
            Timestamp::new(2_000_000_000),
        );
        assert_ne!(base_digest(), digest);

        let other_contract = domain().with_verifying_contract(Address::from_bytes(&[0xdd; 20]));
        let digest = assertion_digest(
            &other_contract,
            &Address::from_bytes(&[1; 20]),
            &Address::from_bytes(&[2; 20]),
            &Nullifier::new([3; 32]),
            Timestamp::new(2_000_000_000),
        );
        assert_ne!(base_digest(), digest);
    }
}
