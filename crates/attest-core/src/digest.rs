//! # Content Digests
//!
//! `ContentDigest` is a 32-byte SHA-256 value. It is produced either from
//! `CanonicalBytes` via [`sha256_digest()`] or by folding existing digests
//! together with [`Sha256Accumulator`] (anchor hashes, batch hashes and audit
//! chain links are concatenations of digests, not JSON documents).
//!
//! Digests serialize as 64-character lowercase hex strings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::AttestError;

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// The all-zero digest. Used as the genesis link of hash chains.
    pub const ZERO: ContentDigest = ContentDigest([0u8; 32]);

    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, AttestError> {
        let hex = hex.trim();
        if hex.len() != 64 {
            return Err(AttestError::InvalidDigest(format!(
                "digest hex must be 64 chars, got {}",
                hex.len()
            )));
        }
        let mut out = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|e| AttestError::InvalidDigest(e.to_string()))?;
            out[i] = u8::from_str_radix(pair, 16)
                .map_err(|e| AttestError::InvalidDigest(format!("invalid hex at {}: {e}", i * 2)))?;
        }
        Ok(Self(out))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Compute the SHA-256 digest of canonical bytes.
///
/// Accepts only `&CanonicalBytes`, so no code path can hash a non-canonical
/// serialization of a structured value.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest(bytes)
}

/// Hex form of [`sha256_digest()`].
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}

/// Incremental SHA-256 over a sequence of byte segments.
///
/// Used where the hashed input is a concatenation (`a ‖ b ‖ c`) of digests,
/// tags, and canonical payloads rather than a single structured value.
#[derive(Clone, Default)]
pub struct Sha256Accumulator {
    hasher: Sha256,
}

impl Sha256Accumulator {
    /// Start an empty accumulator.
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    /// Append raw bytes.
    pub fn update(&mut self, bytes: &[u8]) -> &mut Self {
        self.hasher.update(bytes);
        self
    }

    /// Append the 32 bytes of a digest.
    pub fn update_digest(&mut self, digest: &ContentDigest) -> &mut Self {
        self.hasher.update(digest.as_bytes());
        self
    }

    /// Append canonical bytes.
    pub fn update_canonical(&mut self, data: &CanonicalBytes) -> &mut Self {
        self.hasher.update(data.as_bytes());
        self
    }

    /// Finish and return the digest.
    pub fn finalize(self) -> ContentDigest {
        let hash = self.hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        ContentDigest(bytes)
    }

    /// Finish and return the digest as hex.
    pub fn finalize_hex(self) -> String {
        self.finalize().to_hex()
    }
}
