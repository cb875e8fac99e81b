//! Signing requests and the signer itself.

use crate::digest::{assertion_digest, type_schema};
use crate::SignError;

use serde::{Deserialize, Serialize};
use tally_crypto::sign_message;
use tally_types::{Address, KeyPair, Nullifier, PublicKey, SigningDomain, Timestamp};

/// A raw signing request as it arrives over HTTP.
#[derive(Clone, Debug, Deserialize)]
pub struct SignRequest {
    pub subject: String,
    pub survey: String,
    pub nullifier: String,
    /// Unix timestamp, seconds or milliseconds (normalized).
    pub expiry: u64,
    /// Optional alternate verifying contract, for deployments with more
    /// than one gate.
    #[serde(default)]
    pub domain_override: Option<String>,
}

/// The signed attestation response.
#[derive(Clone, Debug, Serialize)]
pub struct SignedAssertion {
    /// Hex-encoded Ed25519 signature over the structured digest.
    pub signature: String,
    pub domain: SigningDomain,
    pub types: serde_json::Value,
}

/// Holds the process key and default domain. Stateless per request.
pub struct EligibilitySigner {
    keypair: KeyPair,
    domain: SigningDomain,
}

impl EligibilitySigner {
    pub fn new(keypair: KeyPair, domain: SigningDomain) -> Self {
        Self { keypair, domain }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.keypair.public
    }

    pub fn domain(&self) -> &SigningDomain {
        &self.domain
    }

    /// Validate and sign a request against `now`.
    pub fn sign(&self, request: &SignRequest, now: Timestamp) -> Result<SignedAssertion, SignError> {
        let subject = Address::parse(&request.subject)
            .map_err(|e| SignError::InvalidSubject(e.to_string()))?;
        let survey = Address::parse(&request.survey)
            .map_err(|e| SignError::InvalidSurvey(e.to_string()))?;
        let nullifier = Nullifier::parse(&request.nullifier)
            .map_err(|e| SignError::InvalidNullifier(e.to_string()))?;
        let expiry = Timestamp::normalize(request.expiry);
        if expiry <= now {
            return Err(SignError::ExpiryNotInFuture);
        }

        let domain = match &request.domain_override {
            Some(raw) => {
                let contract =
                    Address::parse(raw).map_err(|e| SignError::InvalidSurvey(e.to_string()))?;
                self.domain.with_verifying_contract(contract)
            }
            None => self.domain.clone(),
        };

        let digest = assertion_digest(&domain, &subject, &survey, &nullifier, expiry);
        let signature = sign_message(&digest, &self.keypair.private);

        Ok(SignedAssertion {
            signature: format!("0x{}", hex::encode(signature.as_bytes())),
            domain,
            types: type_schema(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_crypto::{keypair_from_seed, verify_signature};
    use tally_types::Signature;

    fn signer() -> EligibilitySigner {
        EligibilitySigner::new(
            keypair_from_seed(&[7u8; 32]),
            SigningDomain::new("Tally", "1", 31337, Address::from_bytes(&[0xde; 20])),
        )
    }

    fn request() -> SignRequest {
        SignRequest {
            subject: Address::from_bytes(&[1; 20]).to_string(),
            survey: Address::from_bytes(&[2; 20]).to_string(),
            nullifier: Nullifier::new([3; 32]).to_hex(),
            expiry: 2_000_000_000,
            domain_override: None,
        }
    }

    const NOW: Timestamp = Timestamp::new(1_900_000_000);

    #[test]
    fn signing_is_deterministic() {
        let signer = signer();
        let a = signer.sign(&request(), NOW).unwrap();
        let b = signer.sign(&request(), NOW).unwrap();
        assert_eq!(a.signature, b.signature);
    }

    #[test]
    fn signature_verifies_against_rederived_digest() {
        let signer = signer();
        let assertion = signer.sign(&request(), NOW).unwrap();

        let digest = assertion_digest(
            &assertion.domain,
            &Address::from_bytes(&[1; 20]),
            &Address::from_bytes(&[2; 20]),
            &Nullifier::new([3; 32]),
            Timestamp::new(2_000_000_000),
        );
        let bytes = hex::decode(assertion.signature.trim_start_matches("0x")).unwrap();
        let signature = Signature(bytes.try_into().unwrap());
        assert!(verify_signature(&digest, &signature, signer.public_key()));
    }

    #[test]
    fn millisecond_expiry_is_normalized() {
        let signer = signer();
        let mut ms_request = request();
        ms_request.expiry = 2_000_000_000_000; // milliseconds
        let a = signer.sign(&ms_request, NOW).unwrap();
        let b = signer.sign(&request(), NOW).unwrap();
        assert_eq!(a.signature, b.signature);
    }

    #[test]
    fn past_expiry_is_rejected() {
        let signer = signer();
        let mut stale = request();
        stale.expiry = NOW.as_secs() - 1;
        assert!(matches!(
            signer.sign(&stale, NOW),
            Err(SignError::ExpiryNotInFuture)
        ));

        let mut exact = request();
        exact.expiry = NOW.as_secs();
        assert!(matches!(
            signer.sign(&exact, NOW),
            Err(SignError::ExpiryNotInFuture)
        ));
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        let signer = signer();

        let mut bad = request();
        bad.subject = "not-an-address".into();
        assert!(matches!(signer.sign(&bad, NOW), Err(SignError::InvalidSubject(_))));

        let mut bad = request();
        bad.nullifier = "0x1234".into();
        assert!(matches!(
            signer.sign(&bad, NOW),
            Err(SignError::InvalidNullifier(_))
        ));
    }

    #[test]
    fn domain_override_changes_signature_and_reported_domain() {
        let signer = signer();
        let mut overridden = request();
        let alt = Address::from_bytes(&[0xbb; 20]);
        overridden.domain_override = Some(alt.to_string());

        let a = signer.sign(&request(), NOW).unwrap();
        let b = signer.sign(&overridden, NOW).unwrap();
        assert_ne!(a.signature, b.signature);
        assert_eq!(b.domain.verifying_contract, alt);
        assert_eq!(a.domain.verifying_contract, Address::from_bytes(&[0xde; 20]));
    }
}
