//! Signing policy: which key roles may sign, and which signers complete the
//! attestation. A policy is derived once at creation and stored with the
//! attestation, so persisted attestations do not depend on the template set
//! that is loaded later.

use std::collections::{BTreeSet, HashSet};

use attest_crypto::{Ed25519PublicKey, KeyRole};
use serde::{Deserialize, Serialize};

/// Signer-completion rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum SignerRule {
    /// Every listed key must sign.
    AllOf { signers: Vec<Ed25519PublicKey> },
    /// Any `threshold` of the eligible keys.
    Quorum {
        threshold: usize,
        eligible: Vec<Ed25519PublicKey>,
    },
    /// Complete at creation.
    NoSigners,
}

impl SignerRule {
    /// Whether `key` is allowed to sign at all.
    pub fn is_eligible(&self, key: &Ed25519PublicKey) -> bool {
        match self {
            Self::AllOf { signers } => signers.contains(key),
            Self::Quorum { eligible, .. } => eligible.contains(key),
            Self::NoSigners => false,
        }
    }

    /// Number of distinct eligible signatures needed.
    pub fn required_count(&self) -> usize {
        match self {
            Self::AllOf { signers } => signers.len(),
            Self::Quorum { threshold, .. } => *threshold,
            Self::NoSigners => 0,
        }
    }

    /// Whether the keys that have signed satisfy the rule.
    pub fn is_satisfied<'a>(&self, signed: impl IntoIterator<Item = &'a Ed25519PublicKey>) -> bool {
        let counted: HashSet<&Ed25519PublicKey> =
            signed.into_iter().filter(|k| self.is_eligible(k)).collect();
        counted.len() >= self.required_count()
    }
}

/// Snapshot of everything the signing protocol checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningPolicy {
    /// Acceptable roles. Never empty.
    pub key_roles: BTreeSet<KeyRole>,
    pub rule: SignerRule,
}

impl SigningPolicy {
    pub fn accepts_role(&self, role: KeyRole) -> bool {
        self.key_roles.contains(&role)
    }

    pub fn requires_signers(&self) -> bool {
        self.rule.required_count() > 0
    }
}
