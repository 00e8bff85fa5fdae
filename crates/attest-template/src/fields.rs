//! # Contract Field Schemas
//!
//! Every template belongs to one [`ContractKind`], and each kind has exactly
//! one typed field struct. [`ContractFields`] is the closed union of those
//! structs. Once a JSON payload has been parsed into it, "missing field" and
//! "extra field" are unrepresentable.
//!
//! Parsing runs in three stages:
//!
//! 1. The payload must be a JSON object whose key set equals the kind's
//!    required field set ([`ValidationError::FieldSet`]).
//! 2. Each field is deserialized into its typed slot
//!    ([`ValidationError::InvalidField`] names the offending field).
//! 3. Semantic checks run per kind: hash format, split totals, uniqueness,
//!    quorum bounds.
//!
//! Amounts are integers (`split` percent, `royalty_bps` basis points) or
//! strings (`consideration`), never floats.

use std::collections::{BTreeSet, HashSet};

use attest_crypto::Ed25519PublicKey;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::policy::SignerRule;

/// The closed set of contract schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    PublishingSplit,
    OwnershipTransfer,
    LicenseGrant,
    WitnessedStatement,
    ContentRegistration,
}

impl ContractKind {
    /// Required field names, in declaration order.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::PublishingSplit => &["song_title", "song_hash", "parties"],
            Self::OwnershipTransfer => &["asset_title", "asset_hash", "seller", "buyer", "consideration"],
            Self::LicenseGrant => &[
                "work_title",
                "work_hash",
                "licensor",
                "licensee",
                "territory",
                "term_months",
                "royalty_bps",
            ],
            Self::WitnessedStatement => &["title", "document_hash", "statement", "witnesses", "quorum"],
            Self::ContentRegistration => &["title", "content_hash", "owner_name"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PublishingSplit => "publishing_split",
            Self::OwnershipTransfer => "ownership_transfer",
            Self::LicenseGrant => "license_grant",
            Self::WitnessedStatement => "witnessed_statement",
            Self::ContentRegistration => "content_registration",
        }
    }
}

impl std::fmt::Display for ContractKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Field structs
// ---------------------------------------------------------------------------

/// A named signer identified by public key. Matching is by `pubkey` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Party {
    pub name: String,
    pub pubkey: Ed25519PublicKey,
}

/// A party entitled to a whole-percent share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitParty {
    pub name: String,
    pub pubkey: Ed25519PublicKey,
    pub split: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishingSplit {
    pub song_title: String,
    pub song_hash: String,
    pub parties: Vec<SplitParty>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OwnershipTransfer {
    pub asset_title: String,
    pub asset_hash: String,
    pub seller: Party,
    pub buyer: Party,
    /// Free-form, e.g. `"2500 USD"`.
    pub consideration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LicenseGrant {
    pub work_title: String,
    pub work_hash: String,
    pub licensor: Party,
    pub licensee: Party,
    pub territory: String,
    pub term_months: u32,
    /// Basis points, 0..=10000.
    pub royalty_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WitnessedStatement {
    pub title: String,
    pub document_hash: String,
    pub statement: String,
    pub witnesses: Vec<Party>,
    pub quorum: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentRegistration {
    pub title: String,
    pub content_hash: String,
    pub owner_name: String,
}

/// Typed contract payload, one variant per [`ContractKind`].
///
/// The tagged serde form (`{"kind": ..., "values": {...}}`) is what gets
/// persisted. [`ContractFields::to_value`] yields the untagged field object
/// used for content hashing and exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum ContractFields {
    PublishingSplit(PublishingSplit),
    OwnershipTransfer(OwnershipTransfer),
    LicenseGrant(LicenseGrant),
    WitnessedStatement(WitnessedStatement),
    ContentRegistration(ContentRegistration),
}

impl ContractFields {
    /// Parse and validate an untagged field object for `kind`.
    pub fn parse(action: &str, kind: ContractKind, value: &Value) -> Result<Self, ValidationError> {
        let map = value
            .as_object()
            .ok_or_else(|| ValidationError::invalid("fields", "expected a JSON object"))?;
        check_field_set(action, kind, map)?;

        let fields = match kind {
            ContractKind::PublishingSplit => Self::PublishingSplit(PublishingSplit {
                song_title: take(map, "song_title")?,
                song_hash: take(map, "song_hash")?,
                parties: take(map, "parties")?,
            }),
            ContractKind::OwnershipTransfer => Self::OwnershipTransfer(OwnershipTransfer {
                asset_title: take(map, "asset_title")?,
                asset_hash: take(map, "asset_hash")?,
                seller: take(map, "seller")?,
                buyer: take(map, "buyer")?,
                consideration: take(map, "consideration")?,
            }),
            ContractKind::LicenseGrant => Self::LicenseGrant(LicenseGrant {
                work_title: take(map, "work_title")?,
                work_hash: take(map, "work_hash")?,
                licensor: take(map, "licensor")?,
                licensee: take(map, "licensee")?,
                territory: take(map, "territory")?,
                term_months: take(map, "term_months")?,
                royalty_bps: take(map, "royalty_bps")?,
            }),
            ContractKind::WitnessedStatement => Self::WitnessedStatement(WitnessedStatement {
                title: take(map, "title")?,
                document_hash: take(map, "document_hash")?,
                statement: take(map, "statement")?,
                witnesses: take(map, "witnesses")?,
                quorum: take(map, "quorum")?,
            }),
            ContractKind::ContentRegistration => Self::ContentRegistration(ContentRegistration {
                title: take(map, "title")?,
                content_hash: take(map, "content_hash")?,
                owner_name: take(map, "owner_name")?,
            }),
        };
        fields.validate()?;
        Ok(fields)
    }

    pub fn kind(&self) -> ContractKind {
        match self {
            Self::PublishingSplit(_) => ContractKind::PublishingSplit,
            Self::OwnershipTransfer(_) => ContractKind::OwnershipTransfer,
            Self::LicenseGrant(_) => ContractKind::LicenseGrant,
            Self::WitnessedStatement(_) => ContractKind::WitnessedStatement,
            Self::ContentRegistration(_) => ContractKind::ContentRegistration,
        }
    }

    /// The plain field object, without the kind tag.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::PublishingSplit(f) => serde_json::to_value(f),
            Self::OwnershipTransfer(f) => serde_json::to_value(f),
            Self::LicenseGrant(f) => serde_json::to_value(f),
            Self::WitnessedStatement(f) => serde_json::to_value(f),
            Self::ContentRegistration(f) => serde_json::to_value(f),
        }
    }

    /// Who must sign before the attestation completes.
    pub fn signer_rule(&self) -> SignerRule {
        match self {
            Self::PublishingSplit(f) => SignerRule::AllOf {
                signers: f.parties.iter().map(|p| p.pubkey.clone()).collect(),
            },
            Self::OwnershipTransfer(f) => SignerRule::AllOf {
                signers: vec![f.seller.pubkey.clone(), f.buyer.pubkey.clone()],
            },
            Self::LicenseGrant(f) => SignerRule::AllOf {
                signers: vec![f.licensor.pubkey.clone(), f.licensee.pubkey.clone()],
            },
            Self::WitnessedStatement(f) => SignerRule::Quorum {
                threshold: f.quorum as usize,
                eligible: f.witnesses.iter().map(|w| w.pubkey.clone()).collect(),
            },
            Self::ContentRegistration(_) => SignerRule::NoSigners,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::PublishingSplit(f) => {
                non_empty("song_title", &f.song_title)?;
                hash_hex("song_hash", &f.song_hash)?;
                if f.parties.is_empty() {
                    return Err(ValidationError::invalid("parties", "at least one party is required"));
                }
                for p in &f.parties {
                    non_empty("parties.name", &p.name)?;
                }
                unique_keys("parties", f.parties.iter().map(|p| &p.pubkey))?;
                let total: u64 = f.parties.iter().map(|p| u64::from(p.split)).sum();
                if total != 100 {
                    return Err(ValidationError::invalid(
                        "parties",
                        format!("splits must sum to 100, got {total}"),
                    ));
                }
            }
            Self::OwnershipTransfer(f) => {
                non_empty("asset_title", &f.asset_title)?;
                hash_hex("asset_hash", &f.asset_hash)?;
                non_empty("seller.name", &f.seller.name)?;
                non_empty("buyer.name", &f.buyer.name)?;
                non_empty("consideration", &f.consideration)?;
                unique_keys("buyer", [&f.seller.pubkey, &f.buyer.pubkey])?;
            }
            Self::LicenseGrant(f) => {
                non_empty("work_title", &f.work_title)?;
                hash_hex("work_hash", &f.work_hash)?;
                non_empty("licensor.name", &f.licensor.name)?;
                non_empty("licensee.name", &f.licensee.name)?;
                non_empty("territory", &f.territory)?;
                unique_keys("licensee", [&f.licensor.pubkey, &f.licensee.pubkey])?;
                if f.term_months == 0 {
                    return Err(ValidationError::invalid("term_months", "must be at least 1"));
                }
                if f.royalty_bps > 10_000 {
                    return Err(ValidationError::invalid(
                        "royalty_bps",
                        format!("must be at most 10000, got {}", f.royalty_bps),
                    ));
                }
            }
            Self::WitnessedStatement(f) => {
                non_empty("title", &f.title)?;
                hash_hex("document_hash", &f.document_hash)?;
                non_empty("statement", &f.statement)?;
                for w in &f.witnesses {
                    non_empty("witnesses.name", &w.name)?;
                }
                unique_keys("witnesses", f.witnesses.iter().map(|w| &w.pubkey))?;
                let n = f.witnesses.len();
                if f.quorum == 0 || f.quorum as usize > n {
                    return Err(ValidationError::invalid(
                        "quorum",
                        format!("must be between 1 and {n}, got {}", f.quorum),
                    ));
                }
            }
            Self::ContentRegistration(f) => {
                non_empty("title", &f.title)?;
                hash_hex("content_hash", &f.content_hash)?;
                non_empty("owner_name", &f.owner_name)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_field_set(
    action: &str,
    kind: ContractKind,
    map: &Map<String, Value>,
) -> Result<(), ValidationError> {
    let required = kind.required_fields();
    let missing: Vec<String> = required
        .iter()
        .filter(|f| !map.contains_key(**f))
        .map(|f| f.to_string())
        .collect();
    let unexpected: Vec<String> = map
        .keys()
        .filter(|k| !required.contains(&k.as_str()))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if missing.is_empty() && unexpected.is_empty() {
        return Ok(());
    }
    Err(ValidationError::FieldSet {
        action: action.to_string(),
        missing,
        unexpected,
    })
}

fn take<T: DeserializeOwned>(map: &Map<String, Value>, name: &str) -> Result<T, ValidationError> {
    let raw = map
        .get(name)
        .ok_or_else(|| ValidationError::invalid(name, "missing"))?;
    serde_json::from_value(raw.clone()).map_err(|e| ValidationError::invalid(name, e.to_string()))
}

fn non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::invalid(field, "must not be empty"));
    }
    Ok(())
}

fn hash_hex(field: &str, value: &str) -> Result<(), ValidationError> {
    let ok = value.len() == 64 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if !ok {
        return Err(ValidationError::invalid(
            field,
            "must be 64 lowercase hex characters",
        ));
    }
    Ok(())
}

fn unique_keys<'a>(
    field: &str,
    keys: impl IntoIterator<Item = &'a Ed25519PublicKey>,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(ValidationError::invalid(
                field,
                format!("public key {key} appears more than once"),
            ));
        }
    }
    Ok(())
}
