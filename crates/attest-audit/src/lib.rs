//! # attest-audit — Tamper-Evident Audit Trail
//!
//! Every attestation lifecycle transition (`created`, `signed`,
//! `finalized`) is appended to a per-attestation hash chain. The chain is
//! authoritative and local; anchoring to an external ledger is a separate,
//! retrying, at-least-once concern handled by [`PublishWorker`].
//!
//! - [`event`]: [`AuditEvent`] and the link-hash definition.
//! - [`trail`]: [`AuditTrail`], chain verification, restore, receipts.
//! - [`publish`]: the [`LedgerPublisher`] seam.
//! - [`worker`]: [`PublishWorker`] with timeout and exponential backoff.
//! - [`config`]: [`PublishConfig`] from environment variables.

pub mod config;
pub mod error;
pub mod event;
pub mod publish;
pub mod trail;
pub mod worker;

pub use config::PublishConfig;
pub use error::{AuditError, ChainIntegrityError, ConfigError, PublishError};
pub use event::{AuditEvent, AuditEventType, PublishState, ReceiptId};
pub use publish::LedgerPublisher;
pub use trail::{check_events, AuditTrail, PendingPublish};
pub use worker::{DrainReport, PublishStats, PublishStatsSnapshot, PublishWorker};
