//! # attest-crypto — Signing Keys and Verification
//!
//! - [`ed25519`]: Ed25519 key pair, public key and signature newtypes with
//!   hex serde. Signing input is either `&CanonicalBytes` or a
//!   `&ContentDigest`, never arbitrary bytes.
//! - [`role`]: [`KeyRole`], the purpose a signing key is registered for.
//! - [`verifier`]: the [`SignatureVerifier`] seam consumed by the
//!   attestation state machine, and its Ed25519 implementation.
//!
//! Private key material never implements `Serialize` or `Debug` output.

pub mod ed25519;
pub mod error;
pub mod role;
pub mod verifier;

pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use error::CryptoError;
pub use role::KeyRole;
pub use verifier::{Ed25519Verifier, SignatureVerifier};
