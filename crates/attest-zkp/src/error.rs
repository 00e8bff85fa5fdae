use attest_core::CanonicalizationError;
use thiserror::Error;

/// A number that cannot be represented as a [`Quantity`](crate::Quantity).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuantityError {
    #[error("quantity must be finite, got {0}")]
    NotFinite(f64),
    #[error("quantity must not be negative, got {0}")]
    Negative(String),
    #[error("quantity exceeds the maximum of {max}: {value}")]
    TooLarge { value: String, max: String },
    #[error("malformed decimal {input:?}: {reason}")]
    Malformed { input: String, reason: String },
}

/// Error during commitment or proof generation.
#[derive(Error, Debug)]
pub enum ProofError {
    /// The secret does not open the commitment.
    #[error("secret does not open commitment {commitment_hash}")]
    SecretMismatch { commitment_hash: String },

    #[error("challenge must be non-empty hex, got {0:?}")]
    InvalidChallenge(String),

    #[error("batch must contain at least one fact")]
    EmptyBatch,

    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Reason a proof was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("malformed proof: {0}")]
    Malformed(String),

    #[error("{field} is outside (0, M)")]
    BlindedOutOfRange { field: &'static str },

    /// `claimed_compliant` disagrees with the blinded comparison.
    #[error("compliance claim {claimed} contradicts blinded comparison")]
    ClaimContradicted { claimed: bool },

    #[error("batch entry {index}: {source}")]
    BatchEntry {
        index: usize,
        #[source]
        source: Box<VerifyError>,
    },

    #[error("batch entry {index} does not use the shared challenge")]
    ChallengeMismatch { index: usize },

    #[error("batch hash does not recompute")]
    BatchHashMismatch,

    #[error("overall_compliant does not equal the conjunction of entry claims")]
    AggregateMismatch,
}
