//! # Attestation State Machine
//!
//! ```text
//! Draft ──▶ Signing ──▶ Complete (terminal)
//!   │                      ▲
//!   └──────────────────────┘   (no signers required)
//! ```
//!
//! An attestation is created from a template and a validated field set. Its
//! `content_hash` is fixed at creation and is what every signature signs.
//! Signatures are appended in arrival order, at most one per public key.
//! When the signer rule is satisfied the attestation finalizes: the anchor
//! hash is computed over the content hash and every signature digest, and
//! no further signature is accepted.
//!
//! Mutating methods validate everything first and only then change state,
//! so an `Err` always leaves the attestation exactly as it was. On success
//! they return the [`LifecycleEvent`]s the caller must append to the audit
//! trail, in order.

use attest_audit::AuditEventType;
use attest_core::{
    sha256_digest, AttestationId, CanonicalBytes, CanonicalizationError, ContentDigest,
    Sha256Accumulator, Timestamp,
};
use attest_crypto::{Ed25519PublicKey, KeyRole, SignatureVerifier};
use attest_template::{ContractFields, SigningPolicy, TemplateRegistry, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{CreateError, SigningError};
use crate::signature::{SignatureRecord, SignatureSubmission};

// ─── State ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationState {
    Draft,
    Signing,
    Complete,
}

impl AttestationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl std::fmt::Display for AttestationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Draft => "draft",
            Self::Signing => "signing",
            Self::Complete => "complete",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from_state: AttestationState,
    pub to_state: AttestationState,
    pub timestamp: Timestamp,
    pub reason: String,
}

/// An audit event produced by a state change, not yet appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub event_type: AuditEventType,
    pub payload: Value,
}

// ─── Verification report ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureCheck {
    pub pubkey: Ed25519PublicKey,
    pub key_role: KeyRole,
    pub signer_name: String,
    pub valid: bool,
}

/// Side-effect-free re-verification of an attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub id: AttestationId,
    pub signatures: Vec<SignatureCheck>,
    pub all_valid: bool,
    pub finalized: bool,
    /// Stored content hash recomputes from subject, action and fields.
    pub content_hash_consistent: bool,
    /// Stored anchor recomputes from the content hash and signatures.
    /// Vacuously true before finalization.
    pub anchor_consistent: bool,
}

impl VerificationReport {
    /// Everything checks out.
    pub fn is_sound(&self) -> bool {
        self.all_valid && self.content_hash_consistent && self.anchor_consistent
    }
}

// ─── Attestation ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    id: AttestationId,
    subject: String,
    action: String,
    template_version: String,
    fields: ContractFields,
    policy: SigningPolicy,
    signatures: Vec<SignatureRecord>,
    content_hash: ContentDigest,
    state: AttestationState,
    transitions: Vec<TransitionRecord>,
    created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finalized_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    anchor_hash: Option<ContentDigest>,
}

impl Attestation {
    /// Validate `fields` against the template for `action` and create the
    /// attestation.
    ///
    /// Enters `Signing`, or goes straight to `Complete` when the signer rule
    /// needs nobody.
    pub fn create(
        registry: &TemplateRegistry,
        subject: &str,
        action: &str,
        fields: &Value,
    ) -> Result<(Self, Vec<LifecycleEvent>), CreateError> {
        let template = registry.get(action)?;
        if subject.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "subject".into(),
                reason: "must not be empty".into(),
            }
            .into());
        }
        let fields = template.validate_fields(fields)?;
        let policy = template.policy(&fields);
        let content_hash = content_hash(subject, action, &fields)?;

        let mut attestation = Self {
            id: AttestationId::new(),
            subject: subject.to_string(),
            action: action.to_string(),
            template_version: template.version.clone(),
            fields,
            policy,
            signatures: Vec::new(),
            content_hash,
            state: AttestationState::Draft,
            transitions: Vec::new(),
            created_at: Timestamp::now(),
            finalized_at: None,
            anchor_hash: None,
        };

        let mut events = vec![LifecycleEvent {
            event_type: AuditEventType::Created,
            payload: json!({
                "subject": attestation.subject,
                "action": attestation.action,
                "template_version": attestation.template_version,
                "content_hash": attestation.content_hash,
                "required_signers": attestation.policy.rule.required_count(),
            }),
        }];

        if attestation.policy.requires_signers() {
            attestation.do_transition(AttestationState::Signing, "created");
        } else {
            let anchor = anchor_hash(&attestation.content_hash, &[]);
            events.push(attestation.finalize(anchor, "created without required signers"));
        }
        Ok((attestation, events))
    }

    /// Verify and append one signature.
    ///
    /// Checks, in order: the attestation is `Signing`; the key has not
    /// signed yet; the role is acceptable; the key is an eligible signer;
    /// the signature verifies over the content hash.
    pub fn add_signature(
        &mut self,
        submission: SignatureSubmission,
        verifier: &dyn SignatureVerifier,
    ) -> Result<Vec<LifecycleEvent>, SigningError> {
        if self.state != AttestationState::Signing {
            return Err(SigningError::NotInSigningState { state: self.state });
        }
        if self.signatures.iter().any(|s| s.pubkey == submission.pubkey) {
            return Err(SigningError::DuplicateSigner {
                pubkey: submission.pubkey,
            });
        }
        if !self.policy.accepts_role(submission.key_role) {
            return Err(SigningError::RoleMismatch {
                expected: self.policy.key_roles.iter().copied().collect(),
                actual: submission.key_role,
            });
        }
        if !self.policy.rule.is_eligible(&submission.pubkey) {
            return Err(SigningError::SignerNotEligible {
                pubkey: submission.pubkey,
            });
        }
        if !verifier.verify(&self.content_hash, &submission.signature, &submission.pubkey) {
            return Err(SigningError::InvalidSignature {
                pubkey: submission.pubkey,
            });
        }

        let record = SignatureRecord {
            pubkey: submission.pubkey,
            key_role: submission.key_role,
            signer_name: submission.signer_name,
            signature: submission.signature,
            signed_at: Timestamp::now(),
            verified: true,
        };
        let record_digest = record.digest()?;

        let completes = self
            .policy
            .rule
            .is_satisfied(self.signatures.iter().map(|s| &s.pubkey).chain([&record.pubkey]));
        let anchor = if completes {
            let mut digests = self.signature_digests()?;
            digests.push(record_digest);
            Some(anchor_hash(&self.content_hash, &digests))
        } else {
            None
        };

        // Validation done; mutate.
        let signed = LifecycleEvent {
            event_type: AuditEventType::Signed,
            payload: json!({
                "pubkey": record.pubkey,
                "key_role": record.key_role,
                "signer_name": record.signer_name,
                "signature_digest": record_digest,
                "signature_count": self.signatures.len() + 1,
            }),
        };
        self.signatures.push(record);
        let mut events = vec![signed];
        if let Some(anchor) = anchor {
            events.push(self.finalize(anchor, "signer rule satisfied"));
        }
        Ok(events)
    }

    /// Re-verify every signature and both derived hashes.
    pub fn verify_all(&self, verifier: &dyn SignatureVerifier) -> VerificationReport {
        let signatures: Vec<SignatureCheck> = self
            .signatures
            .iter()
            .map(|s| SignatureCheck {
                pubkey: s.pubkey.clone(),
                key_role: s.key_role,
                signer_name: s.signer_name.clone(),
                valid: self.policy.accepts_role(s.key_role)
                    && self.policy.rule.is_eligible(&s.pubkey)
                    && verifier.verify(&self.content_hash, &s.signature, &s.pubkey),
            })
            .collect();
        let all_valid = signatures.iter().all(|c| c.valid);

        let content_hash_consistent = content_hash(&self.subject, &self.action, &self.fields)
            .map(|h| h == self.content_hash)
            .unwrap_or(false);

        let anchor_consistent = match self.anchor_hash {
            None => !self.state.is_terminal(),
            Some(stored) => self
                .signature_digests()
                .map(|d| anchor_hash(&self.content_hash, &d))
                .map(|h| h == stored)
                .unwrap_or(false),
        };

        VerificationReport {
            id: self.id,
            signatures,
            all_valid,
            finalized: self.state.is_terminal(),
            content_hash_consistent,
            anchor_consistent,
        }
    }

    /// Human-readable contract text from the registry's template.
    pub fn render(&self, registry: &TemplateRegistry) -> Result<String, ValidationError> {
        registry.get(&self.action)?.render(&self.fields)
    }

    // ─── Accessors ───────────────────────────────────────────────────

    pub fn id(&self) -> AttestationId {
        self.id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn template_version(&self) -> &str {
        &self.template_version
    }

    pub fn fields(&self) -> &ContractFields {
        &self.fields
    }

    pub fn policy(&self) -> &SigningPolicy {
        &self.policy
    }

    pub fn signatures(&self) -> &[SignatureRecord] {
        &self.signatures
    }

    pub fn content_hash(&self) -> ContentDigest {
        self.content_hash
    }

    pub fn state(&self) -> AttestationState {
        self.state
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn finalized_at(&self) -> Option<Timestamp> {
        self.finalized_at
    }

    pub fn anchor_hash(&self) -> Option<ContentDigest> {
        self.anchor_hash
    }

    /// Public keys still expected to sign (all-of), or every eligible key
    /// that has not signed yet (quorum).
    pub fn outstanding_signers(&self) -> Vec<Ed25519PublicKey> {
        use attest_template::SignerRule;
        let pending = |keys: &[Ed25519PublicKey]| {
            keys.iter()
                .filter(|k| !self.signatures.iter().any(|s| &s.pubkey == *k))
                .cloned()
                .collect()
        };
        if self.state.is_terminal() {
            return Vec::new();
        }
        match &self.policy.rule {
            SignerRule::AllOf { signers } => pending(signers),
            SignerRule::Quorum { eligible, .. } => pending(eligible),
            SignerRule::NoSigners => Vec::new(),
        }
    }

    // ─── Internals ───────────────────────────────────────────────────

    fn signature_digests(&self) -> Result<Vec<ContentDigest>, CanonicalizationError> {
        self.signatures.iter().map(SignatureRecord::digest).collect()
    }

    fn finalize(&mut self, anchor: ContentDigest, reason: &str) -> LifecycleEvent {
        let now = Timestamp::now();
        self.anchor_hash = Some(anchor);
        self.finalized_at = Some(now);
        self.do_transition(AttestationState::Complete, reason);
        tracing::info!(
            attestation_id = %self.id,
            anchor_hash = %anchor,
            signatures = self.signatures.len(),
            "attestation finalized"
        );
        LifecycleEvent {
            event_type: AuditEventType::Finalized,
            payload: json!({
                "anchor_hash": anchor,
                "signature_count": self.signatures.len(),
                "finalized_at": now,
            }),
        }
    }

    fn do_transition(&mut self, to: AttestationState, reason: &str) {
        self.transitions.push(TransitionRecord {
            from_state: self.state,
            to_state: to,
            timestamp: Timestamp::now(),
            reason: reason.to_string(),
        });
        self.state = to;
    }
}

/// `SHA256(canonical {subject, action, fields})`.
pub fn content_hash(
    subject: &str,
    action: &str,
    fields: &ContractFields,
) -> Result<ContentDigest, CanonicalizationError> {
    content_hash_of_value(subject, action, fields.to_value()?)
}

pub(crate) fn content_hash_of_value(
    subject: &str,
    action: &str,
    fields: Value,
) -> Result<ContentDigest, CanonicalizationError> {
    let canonical = CanonicalBytes::new(&json!({
        "subject": subject,
        "action": action,
        "fields": fields,
    }))?;
    Ok(sha256_digest(&canonical))
}

/// `SHA256(content_hash ‖ signature_digest₁ ‖ … ‖ signature_digestₙ)`.
pub fn anchor_hash(content_hash: &ContentDigest, signature_digests: &[ContentDigest]) -> ContentDigest {
    let mut acc = Sha256Accumulator::new();
    acc.update_digest(content_hash);
    for d in signature_digests {
        acc.update_digest(d);
    }
    acc.finalize()
}
