//! # attest-zkp — Privacy Commitment Layer
//!
//! Shows that a numeric fact holds (a concentration below a regulatory
//! limit, say) without disclosing the number.
//!
//! The scheme in [`commitment`] is a documented toy: a hash commitment plus
//! a multiplicatively blinded comparison. It is fronted by the sealed
//! [`CommitmentScheme`] trait so a vetted range proof can replace it
//! without touching callers.
//!
//! Secrets ([`CommitmentSecret`]) never serialize; exports go through
//! [`ProofBundle`] and [`BatchProof`].

pub mod batch;
pub mod bundle;
pub mod commitment;
pub mod error;
pub mod quantity;
pub mod traits;

pub use batch::{check_batch, prove_batch, verify_batch, BatchProof, Fact};
pub use bundle::ProofBundle;
pub use commitment::{
    check_bundle, commit, prove, verify, verify_strict, BlindedValue, Commitment,
    CommitmentSecret, Proof, MODULUS,
};
pub use error::{ProofError, QuantityError, VerifyError};
pub use quantity::Quantity;
pub use traits::{BlindedCommitmentScheme, CommitmentScheme};
