//! # Template Registry
//!
//! An immutable table from action name to [`ContractTemplate`], built once
//! at start-up and shared behind an `Arc`. Loading validates the whole set
//! up front: duplicate actions, empty role sets, and placeholders that do
//! not name a field of the template's kind are configuration errors, not
//! runtime surprises.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use attest_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest};
use attest_crypto::KeyRole;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RegistryError, ValidationError};
use crate::fields::{ContractFields, ContractKind};
use crate::policy::SigningPolicy;

const BUILTIN_TEMPLATES: &str = include_str!("../templates/builtin.yaml");

/// One contract template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractTemplate {
    pub action: String,
    pub version: String,
    pub kind: ContractKind,
    pub key_roles: BTreeSet<KeyRole>,
    pub text: String,
}

impl ContractTemplate {
    pub fn required_fields(&self) -> &'static [&'static str] {
        self.kind.required_fields()
    }

    /// Parse and validate a caller-supplied field object.
    pub fn validate_fields(&self, fields: &Value) -> Result<ContractFields, ValidationError> {
        ContractFields::parse(&self.action, self.kind, fields)
    }

    /// Signing policy for an attestation built from `fields`.
    pub fn policy(&self, fields: &ContractFields) -> SigningPolicy {
        SigningPolicy {
            key_roles: self.key_roles.clone(),
            rule: fields.signer_rule(),
        }
    }

    /// Substitute every `{{field}}` placeholder.
    pub fn render(&self, fields: &ContractFields) -> Result<String, ValidationError> {
        if fields.kind() != self.kind {
            return Err(ValidationError::KindMismatch {
                expected: self.kind,
                actual: fields.kind(),
            });
        }
        let values = fields
            .to_value()
            .map_err(|e| ValidationError::invalid("fields", e.to_string()))?;
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            // Registry load guarantees every opener is closed.
            let Some(end) = after.find("}}") else {
                out.push_str(&rest[start..]);
                return Ok(out);
            };
            let name = after[..end].trim();
            out.push_str(&display_value(values.get(name).unwrap_or(&Value::Null)));
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn check(&self) -> Result<(), RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidTemplate {
            action: self.action.clone(),
            reason: reason.to_string(),
        };
        if self.action.trim().is_empty() {
            return Err(invalid("action must not be empty"));
        }
        if self.version.trim().is_empty() {
            return Err(invalid("version must not be empty"));
        }
        if self.key_roles.is_empty() {
            return Err(invalid("at least one key role is required"));
        }
        let names = placeholders(&self.text).ok_or_else(|| invalid("unterminated placeholder"))?;
        for name in names {
            if !self.required_fields().contains(&name) {
                return Err(RegistryError::UnknownPlaceholder {
                    action: self.action.clone(),
                    placeholder: name.to_string(),
                    kind: self.kind,
                });
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateFile {
    templates: Vec<ContractTemplate>,
}

/// Immutable action → template table.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, ContractTemplate>,
}

impl TemplateRegistry {
    /// Build from a list, rejecting any invalid or duplicate entry.
    pub fn from_templates(
        templates: impl IntoIterator<Item = ContractTemplate>,
    ) -> Result<Self, RegistryError> {
        let mut table = BTreeMap::new();
        for template in templates {
            template.check()?;
            if table.contains_key(&template.action) {
                return Err(RegistryError::DuplicateAction(template.action));
            }
            table.insert(template.action.clone(), template);
        }
        if table.is_empty() {
            return Err(RegistryError::Empty);
        }
        Ok(Self { templates: table })
    }

    /// Parse a YAML template set (`templates: [...]`).
    pub fn from_yaml(yaml: &str) -> Result<Self, RegistryError> {
        let file: TemplateFile = serde_yaml::from_str(yaml)?;
        Self::from_templates(file.templates)
    }

    /// Load a YAML template set from disk.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let registry = Self::from_yaml(&yaml)?;
        tracing::info!(path = %path.display(), templates = registry.len(), "loaded template set");
        Ok(registry)
    }

    /// The template set compiled into the binary.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_yaml(BUILTIN_TEMPLATES)
    }

    pub fn get(&self, action: &str) -> Result<&ContractTemplate, ValidationError> {
        self.templates
            .get(action)
            .ok_or_else(|| ValidationError::UnknownAction {
                action: action.to_string(),
            })
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Digest of the canonical template set, for identifying which
    /// configuration a process runs with.
    pub fn fingerprint(&self) -> Result<ContentDigest, CanonicalizationError> {
        let all: Vec<&ContractTemplate> = self.templates.values().collect();
        Ok(sha256_digest(&CanonicalBytes::new(&all)?))
    }
}

/// Placeholder names in order of appearance, or `None` if one is unclosed.
fn placeholders(text: &str) -> Option<Vec<&str>> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let end = after.find("}}")?;
        names.push(after[..end].trim());
        rest = &after[end + 2..];
    }
    Some(names)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| format!("  - {}", display_value(item)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => {
            let name = map.get("name").and_then(Value::as_str).unwrap_or_default();
            let pubkey = map.get("pubkey").and_then(Value::as_str).unwrap_or_default();
            match map.get("split") {
                Some(split) => format!("{name} ({pubkey}): {split}%"),
                None => format!("{name} ({pubkey})"),
            }
        }
    }
}
