//! Key roles. A signer holds a separate Ed25519 key per purpose, and a
//! template declares which purposes may sign it.

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Purpose a signing key is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyRole {
    Identity,
    Financial,
    Contractual,
    Property,
    Privacy,
}

impl KeyRole {
    pub const ALL: [KeyRole; 5] = [
        KeyRole::Identity,
        KeyRole::Financial,
        KeyRole::Contractual,
        KeyRole::Property,
        KeyRole::Privacy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Financial => "financial",
            Self::Contractual => "contractual",
            Self::Property => "property",
            Self::Privacy => "privacy",
        }
    }
}

impl std::fmt::Display for KeyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KeyRole {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| CryptoError::UnknownRole(s.to_string()))
    }
}
