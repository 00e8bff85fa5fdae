use attest_core::{AttestationId, CanonicalizationError, ContentDigest};
use thiserror::Error;

/// A stored audit chain does not recompute.
///
/// Fatal for the attestation's trail: surfaced for investigation, never
/// repaired in place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "audit chain for {attestation_id} broken at sequence {sequence_no}: \
     {field} expected {expected}, found {actual}"
)]
pub struct ChainIntegrityError {
    pub attestation_id: AttestationId,
    pub sequence_no: u64,
    /// Which check failed: `previous_hash`, `event_hash`, `position`.
    pub field: &'static str,
    pub expected: ContentDigest,
    pub actual: ContentDigest,
}

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("audit payload could not be canonicalized: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    #[error(transparent)]
    Integrity(#[from] ChainIntegrityError),

    #[error("no audit event {sequence_no} for attestation {attestation_id}")]
    EventNotFound {
        attestation_id: AttestationId,
        sequence_no: u64,
    },
}

/// Failure reported by a ledger publisher. Always transient.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("ledger call timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Invalid publish-worker configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },
}
