//! # Attestation Manager
//!
//! Owns the collaborators (store, template registry, signature verifier,
//! audit trail) and is the only component that mutates persisted
//! attestations.
//!
//! ## Concurrency
//!
//! Mutations of one attestation are serialized by a per-id lock held across
//! load → mutate → save → audit append. Mutations of different ids proceed
//! in parallel. Reads take no id lock and see the last saved version.

use std::collections::HashMap;
use std::sync::Arc;

use attest_audit::{AuditEvent, AuditTrail, ChainIntegrityError};
use attest_core::AttestationId;
use attest_crypto::SignatureVerifier;
use attest_template::TemplateRegistry;
use attest_zkp::{prove_batch, BatchProof, CommitmentSecret, Fact};
use parking_lot::Mutex;
use serde_json::Value;

use crate::attestation::{Attestation, AttestationState, LifecycleEvent, VerificationReport};
use crate::error::ManagerError;
use crate::export::AttestationExport;
use crate::signature::SignatureSubmission;
use crate::store::AttestationStore;

pub struct AttestationManager {
    store: Arc<dyn AttestationStore>,
    registry: Arc<TemplateRegistry>,
    verifier: Arc<dyn SignatureVerifier>,
    audit: Arc<AuditTrail>,
    locks: Mutex<HashMap<AttestationId, Arc<Mutex<()>>>>,
}

impl AttestationManager {
    pub fn new(
        store: Arc<dyn AttestationStore>,
        registry: Arc<TemplateRegistry>,
        verifier: Arc<dyn SignatureVerifier>,
        audit: Arc<AuditTrail>,
    ) -> Self {
        Self {
            store,
            registry,
            verifier,
            audit,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    pub fn audit(&self) -> &Arc<AuditTrail> {
        &self.audit
    }

    // ─── Mutations ───────────────────────────────────────────────────

    /// Validate, create, persist, and record the `created` event (plus
    /// `finalized` when no signers are required).
    pub fn create(
        &self,
        subject: &str,
        action: &str,
        fields: &Value,
    ) -> Result<Attestation, ManagerError> {
        let (attestation, events) = Attestation::create(&self.registry, subject, action, fields)
            .map_err(|e| {
                tracing::warn!(action, error = %e, "attestation rejected at creation");
                e
            })?;
        let id = attestation.id();
        self.with_id_lock(&id, || {
            self.save(&attestation)?;
            self.record(&id, events)
        })?;
        tracing::info!(
            attestation_id = %id,
            action,
            content_hash = %attestation.content_hash(),
            state = %attestation.state(),
            "attestation created"
        );
        Ok(attestation)
    }

    /// Verify and append a signature, finalizing when the signer rule is
    /// met. Returns the updated attestation.
    pub fn add_signature(
        &self,
        id: &AttestationId,
        submission: SignatureSubmission,
    ) -> Result<Attestation, ManagerError> {
        let signer = submission.pubkey.clone();
        let attestation = self.with_id_lock(id, || {
            let mut attestation = self.get(id)?;
            let events = attestation
                .add_signature(submission, self.verifier.as_ref())
                .map_err(|e| {
                    tracing::warn!(attestation_id = %id, signer = %signer, error = %e, "signature rejected");
                    e
                })?;
            self.save(&attestation)?;
            self.record(id, events)?;
            Ok::<_, ManagerError>(attestation)
        })?;
        tracing::info!(
            attestation_id = %id,
            signer = %signer,
            signatures = attestation.signatures().len(),
            state = %attestation.state(),
            "signature accepted"
        );
        Ok(attestation)
    }

    // ─── Reads ───────────────────────────────────────────────────────

    pub fn get(&self, id: &AttestationId) -> Result<Attestation, ManagerError> {
        let bytes = self.store.load(id)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn list(&self) -> Result<Vec<AttestationId>, ManagerError> {
        Ok(self.store.list()?)
    }

    pub fn verify_all(&self, id: &AttestationId) -> Result<VerificationReport, ManagerError> {
        Ok(self.get(id)?.verify_all(self.verifier.as_ref()))
    }

    pub fn export(&self, id: &AttestationId) -> Result<AttestationExport, ManagerError> {
        Ok(self.get(id)?.export()?)
    }

    pub fn render(&self, id: &AttestationId) -> Result<String, ManagerError> {
        Ok(self.get(id)?.render(&self.registry)?)
    }

    pub fn audit_events(&self, id: &AttestationId) -> Vec<AuditEvent> {
        self.audit.events(id)
    }

    /// Recompute the attestation's audit chain from the start.
    pub fn verify_audit(&self, id: &AttestationId) -> Result<(), ChainIntegrityError> {
        self.audit.check_chain(id).map_err(|e| {
            tracing::error!(
                attestation_id = %id,
                sequence_no = e.sequence_no,
                field = e.field,
                "audit chain integrity failure"
            );
            e
        })
    }

    // ─── Privacy ─────────────────────────────────────────────────────

    /// Prove threshold facts about a finalized attestation.
    ///
    /// Each label is namespaced as `<anchor_hash>:<label>` so the batch is
    /// bound to exactly this signed content.
    pub fn prove_facts(
        &self,
        id: &AttestationId,
        facts: &[Fact],
    ) -> Result<(BatchProof, Vec<CommitmentSecret>), ManagerError> {
        let attestation = self.get(id)?;
        let anchor = match (attestation.state(), attestation.anchor_hash()) {
            (AttestationState::Complete, Some(anchor)) => anchor,
            (state, _) => return Err(ManagerError::NotFinalized { id: *id, state }),
        };
        let bound: Vec<Fact> = facts
            .iter()
            .map(|f| Fact {
                label: format!("{anchor}:{}", f.label),
                value: f.value,
                threshold: f.threshold,
            })
            .collect();
        let result = prove_batch(&bound)?;
        tracing::info!(
            attestation_id = %id,
            facts = facts.len(),
            overall_compliant = result.0.overall_compliant,
            "facts proven"
        );
        Ok(result)
    }

    // ─── Internals ───────────────────────────────────────────────────

    /// Run `f` holding the id's mutex. The map entry is dropped again once
    /// no other caller holds or waits on it.
    fn with_id_lock<T>(&self, id: &AttestationId, f: impl FnOnce() -> T) -> T {
        let lock = self.locks.lock().entry(*id).or_default().clone();
        let result = {
            let _guard = lock.lock();
            f()
        };
        let mut locks = self.locks.lock();
        drop(lock);
        if locks.get(id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(id);
        }
        result
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().len()
    }

    fn save(&self, attestation: &Attestation) -> Result<(), ManagerError> {
        let bytes = serde_json::to_vec(attestation)?;
        self.store.save(&attestation.id(), &bytes)?;
        Ok(())
    }

    fn record(&self, id: &AttestationId, events: Vec<LifecycleEvent>) -> Result<(), ManagerError> {
        for event in events {
            self.audit.append(*id, event.event_type, event.payload)?;
        }
        Ok(())
    }
}
