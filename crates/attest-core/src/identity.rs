//! # Identifiers
//!
//! Newtype wrapper for attestation identifiers. Opaque, unique, assigned at
//! creation and never changed afterwards.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AttestError;

/// Unique identifier of one attestation.
///
/// Serializes as the bare UUID string so exports stay flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttestationId(Uuid);

impl AttestationId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse the textual UUID form.
    pub fn parse(s: &str) -> Result<Self, AttestError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| AttestError::InvalidIdentifier {
                value: s.to_string(),
                reason: e.to_string(),
            })
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AttestationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AttestationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AttestationId {
    type Err = AttestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
