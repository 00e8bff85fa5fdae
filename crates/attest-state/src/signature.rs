//! Signature submissions and the records kept on an attestation.

use attest_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest, Timestamp};
use attest_crypto::{Ed25519PublicKey, Ed25519Signature, KeyRole};
use serde::{Deserialize, Serialize};

/// What a signer hands in: a signature over the content hash plus the key
/// it claims to be using and in which role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSubmission {
    pub pubkey: Ed25519PublicKey,
    pub key_role: KeyRole,
    pub signer_name: String,
    pub signature: Ed25519Signature,
}

/// An accepted signature. Append-only; never modified once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub pubkey: Ed25519PublicKey,
    pub key_role: KeyRole,
    pub signer_name: String,
    pub signature: Ed25519Signature,
    pub signed_at: Timestamp,
    /// Whether the signature verified when it was accepted.
    pub verified: bool,
}

/// Export form of one signature entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignatureExport {
    pub pubkey: Ed25519PublicKey,
    pub key_role: KeyRole,
    pub signer_name: String,
    pub signature_hex: Ed25519Signature,
    pub signed_at: Timestamp,
}

impl SignatureRecord {
    pub fn export(&self) -> SignatureExport {
        SignatureExport {
            pubkey: self.pubkey.clone(),
            key_role: self.key_role,
            signer_name: self.signer_name.clone(),
            signature_hex: self.signature.clone(),
            signed_at: self.signed_at,
        }
    }

    /// SHA-256 over the canonical export form. These digests, in order,
    /// feed the anchor hash.
    pub fn digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        self.export().digest()
    }
}

impl SignatureExport {
    pub fn digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        Ok(sha256_digest(&CanonicalBytes::new(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_crypto::Ed25519KeyPair;

    fn record() -> SignatureRecord {
        let kp = Ed25519KeyPair::from_seed(&[3u8; 32]);
        SignatureRecord {
            pubkey: kp.public_key(),
            key_role: KeyRole::Contractual,
            signer_name: "Alice".into(),
            signature: kp.sign_digest(&ContentDigest::ZERO),
            signed_at: Timestamp::from_epoch_secs(1_700_000_000).unwrap(),
            verified: true,
        }
    }

    #[test]
    fn export_renames_signature_and_drops_verified() {
        let v = serde_json::to_value(record().export()).unwrap();
        assert!(v.get("signature_hex").is_some());
        assert!(v.get("signature").is_none());
        assert!(v.get("verified").is_none());
        assert_eq!(v["key_role"], serde_json::json!("contractual"));
    }

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        let a = record();
        assert_eq!(a.digest().unwrap(), a.digest().unwrap());
        let mut b = a.clone();
        b.signer_name = "Mallory".into();
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
    }
}
