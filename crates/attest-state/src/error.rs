use attest_audit::AuditError;
use attest_core::{AttestationId, CanonicalizationError};
use attest_crypto::{Ed25519PublicKey, KeyRole};
use attest_template::ValidationError;
use attest_zkp::ProofError;
use thiserror::Error;

use crate::attestation::AttestationState;

/// Signing-protocol violation. The attestation is unchanged when one of
/// these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("attestation is {state}, not accepting signatures")]
    NotInSigningState { state: AttestationState },

    #[error("{pubkey} has already signed")]
    DuplicateSigner { pubkey: Ed25519PublicKey },

    #[error("key role {actual} is not accepted; expected one of {expected:?}")]
    RoleMismatch {
        expected: Vec<KeyRole>,
        actual: KeyRole,
    },

    #[error("{pubkey} is not a signer of this attestation")]
    SignerNotEligible { pubkey: Ed25519PublicKey },

    #[error("signature by {pubkey} does not verify against the content hash")]
    InvalidSignature { pubkey: Ed25519PublicKey },

    #[error("signature record could not be canonicalized: {0}")]
    Canonicalization(String),
}

impl From<CanonicalizationError> for SigningError {
    fn from(e: CanonicalizationError) -> Self {
        Self::Canonicalization(e.to_string())
    }
}

/// Failure creating an attestation.
#[derive(Error, Debug)]
pub enum CreateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("content could not be canonicalized: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Persistence collaborator failure.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("attestation {0} not found")]
    NotFound(AttestationId),

    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("attestation {0} not found")]
    NotFound(AttestationId),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    #[error("storage error: {0}")]
    Store(StoreError),

    #[error("stored attestation is unreadable: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error("attestation {id} is {state}; facts can only be proven for complete attestations")]
    NotFinalized {
        id: AttestationId,
        state: AttestationState,
    },

    #[error(transparent)]
    Proof(#[from] ProofError),
}

impl From<StoreError> for ManagerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

impl From<CreateError> for ManagerError {
    fn from(e: CreateError) -> Self {
        match e {
            CreateError::Validation(v) => Self::Validation(v),
            CreateError::Canonicalization(c) => Self::Canonicalization(c),
        }
    }
}
