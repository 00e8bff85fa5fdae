//! Canonical proof export. Contains the public commitment data and the
//! proof, never the secret.

use attest_core::{CanonicalBytes, CanonicalizationError, ContentDigest};
use serde::{Deserialize, Serialize};

use crate::commitment::{BlindedValue, Commitment, Proof};
use crate::quantity::Quantity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProofBundle {
    pub commitment_hash: ContentDigest,
    pub public_threshold: Quantity,
    pub public_label: String,
    pub blinded_value: BlindedValue,
    pub blinded_threshold: BlindedValue,
    pub proof_hash: ContentDigest,
    pub challenge: String,
    pub claimed_compliant: bool,
}

impl ProofBundle {
    pub fn new(commitment: &Commitment, proof: &Proof) -> Self {
        Self {
            commitment_hash: commitment.commitment_hash,
            public_threshold: commitment.public_threshold,
            public_label: commitment.public_label.clone(),
            blinded_value: proof.blinded_value,
            blinded_threshold: proof.blinded_threshold,
            proof_hash: proof.proof_hash,
            challenge: proof.challenge.clone(),
            claimed_compliant: proof.claimed_compliant,
        }
    }

    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::{check_bundle, commit, prove};

    #[test]
    fn export_has_exactly_the_public_fields() {
        let (c, s) = commit(
            Quantity::from_f64(0.8).unwrap(),
            Quantity::from_f64(5.0).unwrap(),
            "benzene",
        )
        .unwrap();
        let p = prove(&c, &s, None).unwrap();
        let bundle = ProofBundle::new(&c, &p);
        let v: serde_json::Value =
            serde_json::from_slice(bundle.canonical_bytes().unwrap().as_bytes()).unwrap();
        let mut keys: Vec<&str> = v.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "blinded_threshold",
                "blinded_value",
                "challenge",
                "claimed_compliant",
                "commitment_hash",
                "proof_hash",
                "public_label",
                "public_threshold",
            ]
        );
        assert_eq!(v["public_threshold"], serde_json::json!("5"));
        assert!(!v.to_string().contains("nonce"));
    }

    #[test]
    fn bundle_roundtrips_and_verifies() {
        let (c, s) = commit(
            Quantity::from_f64(1.0).unwrap(),
            Quantity::from_f64(2.0).unwrap(),
            "x",
        )
        .unwrap();
        let bundle = ProofBundle::new(&c, &prove(&c, &s, None).unwrap());
        let json = serde_json::to_string(&bundle).unwrap();
        let back: ProofBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bundle);
        assert!(check_bundle(&back, true).is_ok());
    }
}
