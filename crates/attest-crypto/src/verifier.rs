//! # Signature Verification Seam
//!
//! The attestation state machine never touches key material. It asks a
//! [`SignatureVerifier`] whether a signature over a content hash is valid
//! for a public key. The production implementation is [`Ed25519Verifier`];
//! tests may substitute their own.

use attest_core::ContentDigest;

use crate::ed25519::{verify_digest, Ed25519PublicKey, Ed25519Signature};

/// Verifies signatures over content-hash bytes.
pub trait SignatureVerifier: Send + Sync {
    /// `true` iff `signature` is a valid signature by `public_key` over the
    /// 32 bytes of `message`.
    fn verify(
        &self,
        message: &ContentDigest,
        signature: &Ed25519Signature,
        public_key: &Ed25519PublicKey,
    ) -> bool;
}

/// Ed25519 verification with `ed25519-dalek`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(
        &self,
        message: &ContentDigest,
        signature: &Ed25519Signature,
        public_key: &Ed25519PublicKey,
    ) -> bool {
        verify_digest(message, signature, public_key).is_ok()
    }
}
