//! # Commitment Scheme Trait (Sealed)
//!
//! Callers that only need `commit / prove / verify` go through
//! [`CommitmentScheme`]. The trait is sealed: implementations live in this
//! crate, so a replacement scheme (a real range proof) is added here and
//! reviewed, not plugged in downstream.

use crate::commitment::{self, Commitment, CommitmentSecret, Proof};
use crate::error::ProofError;
use crate::quantity::Quantity;

mod private {
    pub trait Sealed {}
}

pub trait CommitmentScheme: private::Sealed + Send + Sync {
    type Commitment: Send + Sync;
    type Secret: Send + Sync;
    type Proof: Send + Sync;

    fn commit(
        &self,
        value: Quantity,
        threshold: Quantity,
        label: &str,
    ) -> Result<(Self::Commitment, Self::Secret), ProofError>;

    fn prove(
        &self,
        commitment: &Self::Commitment,
        secret: &Self::Secret,
        challenge: Option<&str>,
    ) -> Result<Self::Proof, ProofError>;

    fn verify(&self, commitment: &Self::Commitment, proof: &Self::Proof) -> bool;
}

/// The blinded-multiplication scheme in [`crate::commitment`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BlindedCommitmentScheme {
    /// Reject non-compliance claims that the blinded pair contradicts.
    pub strict: bool,
}

impl private::Sealed for BlindedCommitmentScheme {}

impl CommitmentScheme for BlindedCommitmentScheme {
    type Commitment = Commitment;
    type Secret = CommitmentSecret;
    type Proof = Proof;

    fn commit(
        &self,
        value: Quantity,
        threshold: Quantity,
        label: &str,
    ) -> Result<(Commitment, CommitmentSecret), ProofError> {
        commitment::commit(value, threshold, label)
    }

    fn prove(
        &self,
        commitment: &Commitment,
        secret: &CommitmentSecret,
        challenge: Option<&str>,
    ) -> Result<Proof, ProofError> {
        commitment::prove(commitment, secret, challenge)
    }

    fn verify(&self, commitment: &Commitment, proof: &Proof) -> bool {
        if self.strict {
            commitment::verify_strict(commitment, proof)
        } else {
            commitment::verify(commitment, proof)
        }
    }
}
