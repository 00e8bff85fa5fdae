//! The on-disk data directory shared by every subcommand.
//!
//! ```text
//! <data_dir>/
//!   attestations/<id>.json   serialized attestations
//!   audit/<id>.json          audit chains (JSON array of events)
//!   locks/<id>.lock          held while an invocation mutates <id>
//!   ledger/<digest>.json     default DirectoryLedger target
//! ```
//!
//! Each CLI invocation starts with an empty in-memory audit trail. Chains
//! are restored from disk on demand. Restoring verifies the chain and checks
//! it against the stored attestation, so a tampered or truncated chain is
//! never extended.
//!
//! Every write of an existing attestation or chain happens under that id's
//! [`IdLock`], re-reading the persisted form first. Two invocations touching
//! the same attestation are therefore ordered, and neither writes back a
//! stale copy over the other's events.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use attest_audit::{AuditEvent, AuditEventType, AuditTrail};
use attest_core::AttestationId;
use attest_crypto::Ed25519Verifier;
use attest_state::{
    Attestation, AttestationManager, AttestationState, AttestationStore, FileStore,
    SignatureSubmission,
};
use attest_template::TemplateRegistry;

use crate::config::CliConfig;
use crate::lock::IdLock;

pub struct Context {
    data_dir: PathBuf,
    manager: AttestationManager,
    audit: Arc<AuditTrail>,
    attestations: Arc<dyn AttestationStore>,
    chains: Arc<dyn AttestationStore>,
    lock_timeout: Duration,
}

impl Context {
    pub fn open(config: &CliConfig) -> Result<Self> {
        let registry = match &config.templates {
            Some(path) => TemplateRegistry::load(path)
                .with_context(|| format!("loading templates from {}", path.display()))?,
            None => TemplateRegistry::builtin().context("loading built-in templates")?,
        };
        let attestations = FileStore::open(config.data_dir.join("attestations"))?;
        let chains = FileStore::open(config.data_dir.join("audit"))?;
        let ctx = Self::with_stores(
            config,
            Arc::new(registry),
            Arc::new(attestations),
            Arc::new(chains),
        );
        tracing::debug!(data_dir = %config.data_dir.display(), "data directory opened");
        Ok(ctx)
    }

    /// Build over explicit stores for attestations and audit chains.
    pub fn with_stores(
        config: &CliConfig,
        registry: Arc<TemplateRegistry>,
        attestations: Arc<dyn AttestationStore>,
        chains: Arc<dyn AttestationStore>,
    ) -> Self {
        let audit = Arc::new(AuditTrail::new());
        let manager = AttestationManager::new(
            Arc::clone(&attestations),
            registry,
            Arc::new(Ed25519Verifier),
            Arc::clone(&audit),
        );
        Self {
            data_dir: config.data_dir.clone(),
            manager,
            audit,
            attestations,
            chains,
            lock_timeout: config.lock_timeout,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn manager(&self) -> &AttestationManager {
        &self.manager
    }

    pub fn audit(&self) -> &Arc<AuditTrail> {
        &self.audit
    }

    /// Exclusive hold on `id` against other invocations.
    pub fn lock(&self, id: &AttestationId) -> Result<IdLock> {
        IdLock::acquire(&self.data_dir.join("locks"), id, self.lock_timeout)
    }

    // ─── Mutations ───────────────────────────────────────────────────

    /// Create an attestation and persist its chain.
    pub fn create(&self, subject: &str, action: &str, fields: &serde_json::Value) -> Result<Attestation> {
        let attestation = self.manager.create(subject, action, fields)?;
        self.save_chain(&attestation.id())?;
        Ok(attestation)
    }

    /// Add a signature and persist the attestation together with its chain.
    ///
    /// Runs under the id lock from chain restore to the final write. When
    /// the chain cannot be written, the previous attestation file is put
    /// back, so the signature and its `signed` event persist together or
    /// not at all.
    pub fn sign(&self, id: &AttestationId, submission: SignatureSubmission) -> Result<Attestation> {
        let _lock = self.lock(id)?;
        self.load_chain(id)?;
        let previous = self.attestations.load(id)?;
        let updated = self.manager.add_signature(id, submission)?;

        if let Err(e) = self.save_chain(id) {
            match self.attestations.save(id, &previous) {
                Ok(()) => tracing::warn!(attestation_id = %id, "audit chain write failed, signature rolled back"),
                Err(rollback) => tracing::error!(
                    attestation_id = %id,
                    error = %rollback,
                    "audit chain write failed and the signature could not be rolled back"
                ),
            }
            return Err(e.context(format!("signature on {id} not recorded")));
        }
        Ok(updated)
    }

    /// Copy receipts that this context's trail obtained onto the persisted
    /// chain for `id`. Returns how many were newly attached.
    ///
    /// The chain is re-read under the id lock, so events appended by other
    /// invocations since this context loaded it are kept. A receipt only
    /// lands on an event whose hash still matches the one published.
    pub fn merge_receipts(&self, id: &AttestationId) -> Result<usize> {
        let _lock = self.lock(id)?;
        let persisted = AuditTrail::new();
        persisted
            .restore(*id, self.read_chain(id)?)
            .with_context(|| format!("audit chain for {id} failed verification"))?;

        let mut attached = 0;
        for event in self.audit.events(id) {
            let Some(receipt) = event.external_receipt else {
                continue;
            };
            match persisted.event(id, event.sequence_no) {
                Some(current) if current.event_hash == event.event_hash => {
                    if persisted.attach_receipt(id, event.sequence_no, receipt)? {
                        attached += 1;
                    }
                }
                _ => tracing::warn!(
                    attestation_id = %id,
                    sequence_no = event.sequence_no,
                    "published event no longer matches the stored chain, receipt dropped"
                ),
            }
        }
        if attached > 0 {
            self.write_chain(id, &persisted.events(id))?;
        }
        Ok(attached)
    }

    // ─── Chains ──────────────────────────────────────────────────────

    /// Events persisted for `id`, read without verification.
    pub fn read_chain(&self, id: &AttestationId) -> Result<Vec<AuditEvent>> {
        let bytes = self
            .chains
            .load(id)
            .with_context(|| format!("no audit chain for attestation {id}"))?;
        serde_json::from_slice(&bytes).with_context(|| format!("audit chain for {id} is unreadable"))
    }

    /// Restore the persisted chain for `id` into the in-memory trail.
    ///
    /// Fails when the chain does not verify, or when it does not account
    /// for every signature and the finalization of the stored attestation.
    pub fn load_chain(&self, id: &AttestationId) -> Result<()> {
        let events = self.read_chain(id)?;
        let attestation = self.manager.get(id)?;
        check_in_step(&attestation, &events)?;
        self.audit
            .restore(*id, events)
            .with_context(|| format!("audit chain for {id} failed verification"))?;
        Ok(())
    }

    /// Restore every persisted chain that verifies, each read under its id
    /// lock. Chains that fail are logged and left out.
    pub fn load_all_chains(&self) -> Result<Vec<AttestationId>> {
        let mut loaded = Vec::new();
        for id in self.chains.list()? {
            let restored = self.lock(&id).and_then(|_lock| self.load_chain(&id));
            match restored {
                Ok(()) => loaded.push(id),
                Err(e) => tracing::error!(attestation_id = %id, "skipping chain: {e:#}"),
            }
        }
        Ok(loaded)
    }

    /// Write the in-memory chain for `id` to disk.
    fn save_chain(&self, id: &AttestationId) -> Result<()> {
        self.write_chain(id, &self.audit.events(id))
    }

    fn write_chain(&self, id: &AttestationId, events: &[AuditEvent]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(events)?;
        self.chains
            .save(id, &bytes)
            .with_context(|| format!("writing audit chain for {id}"))?;
        Ok(())
    }
}

/// A verifying chain can still be a shortened one. Compare it with what the
/// attestation itself records.
fn check_in_step(attestation: &Attestation, events: &[AuditEvent]) -> Result<()> {
    let count = |t: AuditEventType| events.iter().filter(|e| e.event_type == t).count();
    let signed = count(AuditEventType::Signed);
    let finalized = count(AuditEventType::Finalized);
    let signatures = attestation.signatures().len();
    let complete = usize::from(attestation.state() == AttestationState::Complete);
    if count(AuditEventType::Created) != 1 || signed != signatures || finalized != complete {
        bail!(
            "audit chain for {} is out of step with the stored attestation: \
             {signatures} signatures and state {}, but {signed} signed and {finalized} finalized events",
            attestation.id(),
            attestation.state()
        );
    }
    Ok(())
}
