//! # Canonical Attestation Export
//!
//! The export is the portable form of an attestation: the plain field object
//! (no kind tag), the content hash, every signature in order, and the anchor
//! once finalized. Canonical bytes of the export are byte-stable, so a third
//! party holding only the export can recompute both hashes and re-verify
//! every signature without access to the engine's store.

use attest_core::{AttestationId, CanonicalBytes, CanonicalizationError, ContentDigest, Timestamp};
use attest_crypto::SignatureVerifier;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attestation::{anchor_hash, content_hash_of_value, Attestation};
use crate::signature::SignatureExport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttestationExport {
    pub id: AttestationId,
    pub subject: String,
    pub action: String,
    pub fields: Value,
    pub content_hash: ContentDigest,
    pub signatures: Vec<SignatureExport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_hash: Option<ContentDigest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<Timestamp>,
}

/// Result of checking an export offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportCheck {
    pub content_hash_consistent: bool,
    /// `None` when the export carries no anchor.
    pub anchor_consistent: Option<bool>,
    /// Indices of signatures that do not verify over the content hash.
    pub invalid_signatures: Vec<usize>,
}

impl ExportCheck {
    pub fn is_sound(&self) -> bool {
        self.content_hash_consistent
            && self.anchor_consistent != Some(false)
            && self.invalid_signatures.is_empty()
    }
}

impl Attestation {
    pub fn export(&self) -> Result<AttestationExport, serde_json::Error> {
        Ok(AttestationExport {
            id: self.id(),
            subject: self.subject().to_string(),
            action: self.action().to_string(),
            fields: self.fields().to_value()?,
            content_hash: self.content_hash(),
            signatures: self.signatures().iter().map(|s| s.export()).collect(),
            anchor_hash: self.anchor_hash(),
            finalized_at: self.finalized_at(),
        })
    }
}

impl AttestationExport {
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(self)
    }

    /// `SHA256(canonical {subject, action, fields})` from the exported values.
    pub fn recompute_content_hash(&self) -> Result<ContentDigest, CanonicalizationError> {
        content_hash_of_value(&self.subject, &self.action, self.fields.clone())
    }

    /// Anchor over the exported content hash and signature entries.
    pub fn recompute_anchor_hash(&self) -> Result<ContentDigest, CanonicalizationError> {
        let digests = self
            .signatures
            .iter()
            .map(SignatureExport::digest)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(anchor_hash(&self.content_hash, &digests))
    }

    /// Recompute both hashes and verify every signature.
    pub fn check(&self, verifier: &dyn SignatureVerifier) -> Result<ExportCheck, CanonicalizationError> {
        let content_hash_consistent = self.recompute_content_hash()? == self.content_hash;
        let anchor_consistent = match self.anchor_hash {
            Some(stored) => Some(self.recompute_anchor_hash()? == stored),
            None => None,
        };
        let invalid_signatures = self
            .signatures
            .iter()
            .enumerate()
            .filter(|(_, s)| !verifier.verify(&self.content_hash, &s.signature_hex, &s.pubkey))
            .map(|(i, _)| i)
            .collect();
        Ok(ExportCheck {
            content_hash_consistent,
            anchor_consistent,
            invalid_signatures,
        })
    }
}
