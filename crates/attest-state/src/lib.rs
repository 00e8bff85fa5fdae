//! # attest-state — Attestation Lifecycle
//!
//! - [`attestation`]: the [`Attestation`] aggregate and its
//!   `Draft → Signing → Complete` state machine.
//! - [`signature`]: signature submissions, records, and their export form.
//! - [`export`]: the canonical [`AttestationExport`] and offline checks.
//! - [`store`]: the [`AttestationStore`] persistence seam with in-memory and
//!   file-backed implementations.
//! - [`manager`]: [`AttestationManager`], which serializes mutations per
//!   attestation and feeds the audit trail.

pub mod attestation;
pub mod error;
pub mod export;
pub mod manager;
pub mod signature;
pub mod store;

pub use attestation::{
    anchor_hash, content_hash, Attestation, AttestationState, LifecycleEvent, SignatureCheck,
    TransitionRecord, VerificationReport,
};
pub use error::{CreateError, ManagerError, SigningError, StoreError};
pub use export::{AttestationExport, ExportCheck};
pub use manager::AttestationManager;
pub use signature::{SignatureExport, SignatureRecord, SignatureSubmission};
pub use store::{AttestationStore, FileStore, InMemoryStore};
