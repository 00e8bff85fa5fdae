//! Audit events and their hash-chain links.
//!
//! ```text
//! event_hash = SHA256(previous_hash ‖ event_type ‖ canonical(envelope))
//! envelope   = {attestation_id, sequence_no, created_at, payload}
//! ```
//!
//! `previous_hash` of event 0 is [`ContentDigest::ZERO`]. Publish metadata
//! (`external_receipt`, `publish_state`) is outside the hash: it is attached
//! after the fact and does not change the chain.

use attest_core::{
    AttestationId, CanonicalBytes, CanonicalizationError, ContentDigest, Sha256Accumulator,
    Timestamp,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    Created,
    Signed,
    Finalized,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Signed => "signed",
            Self::Finalized => "finalized",
        }
    }
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishState {
    Pending,
    Published,
}

/// Opaque receipt returned by the external ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(pub String);

impl std::fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One immutable link in an attestation's audit chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub attestation_id: AttestationId,
    pub sequence_no: u64,
    pub event_type: AuditEventType,
    pub payload: Value,
    pub previous_hash: ContentDigest,
    pub event_hash: ContentDigest,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_receipt: Option<ReceiptId>,
    pub publish_state: PublishState,
}

#[derive(Serialize)]
struct Envelope<'a> {
    attestation_id: &'a AttestationId,
    sequence_no: u64,
    created_at: &'a Timestamp,
    payload: &'a Value,
}

/// The chain-relevant part of an event, as handed to the ledger.
#[derive(Serialize)]
struct LedgerRecord<'a> {
    attestation_id: &'a AttestationId,
    sequence_no: u64,
    event_type: AuditEventType,
    payload: &'a Value,
    previous_hash: &'a ContentDigest,
    event_hash: &'a ContentDigest,
    created_at: &'a Timestamp,
}

/// Compute the hash of an event from its chain position and content.
pub fn link_hash(
    previous_hash: &ContentDigest,
    event_type: AuditEventType,
    attestation_id: &AttestationId,
    sequence_no: u64,
    created_at: &Timestamp,
    payload: &Value,
) -> Result<ContentDigest, CanonicalizationError> {
    let envelope = CanonicalBytes::new(&Envelope {
        attestation_id,
        sequence_no,
        created_at,
        payload,
    })?;
    let mut acc = Sha256Accumulator::new();
    acc.update_digest(previous_hash)
        .update(event_type.as_str().as_bytes())
        .update_canonical(&envelope);
    Ok(acc.finalize())
}

impl AuditEvent {
    /// Canonical bytes submitted to the external ledger.
    pub fn ledger_bytes(&self) -> Result<Vec<u8>, CanonicalizationError> {
        let record = LedgerRecord {
            attestation_id: &self.attestation_id,
            sequence_no: self.sequence_no,
            event_type: self.event_type,
            payload: &self.payload,
            previous_hash: &self.previous_hash,
            event_hash: &self.event_hash,
            created_at: &self.created_at,
        };
        Ok(CanonicalBytes::new(&record)?.into_bytes())
    }

    pub fn is_pending(&self) -> bool {
        self.publish_state == PublishState::Pending
    }
}
