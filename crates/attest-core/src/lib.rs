//! # attest-core — Foundational Types
//!
//! Leaf crate of the attestation engine. Every hash and every signature in
//! the workspace is computed over bytes produced here, so the types in this
//! crate carry the determinism guarantees the rest of the system relies on.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** All digest and signing input flows through
//!    `CanonicalBytes::new()`. No raw `serde_json::to_vec()` for hashing.
//!
//! 2. **`sha256_digest()` accepts only `&CanonicalBytes`.** Concatenations of
//!    already-derived digests go through [`Sha256Accumulator`], never through
//!    ad-hoc byte buffers.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] renders `YYYY-MM-DDTHH:MM:SSZ`
//!    so that timestamps inside canonical payloads are byte-stable.
//!
//! 4. **Newtype identifiers.** [`AttestationId`] cannot be confused with any
//!    other UUID-shaped value.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `attest-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, Sha256Accumulator};
pub use error::{AttestError, CanonicalizationError};
pub use identity::AttestationId;
pub use temporal::Timestamp;
