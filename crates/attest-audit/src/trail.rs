//! # Audit Trail
//!
//! One append-only hash chain per attestation. `sequence_no` assignment is
//! linearized per attestation by the chain's own mutex, so concurrent
//! appends to different attestations never contend and appends to the same
//! attestation produce a gap-free sequence.
//!
//! Every appended event starts `pending` and is pushed onto the publish
//! queue while the chain lock is still held. Queue order per attestation
//! therefore matches chain order. Publishing happens elsewhere
//! ([`crate::worker::PublishWorker`]); appending never waits on it.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use attest_core::{AttestationId, ContentDigest, Timestamp};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::error::{AuditError, ChainIntegrityError};
use crate::event::{link_hash, AuditEvent, AuditEventType, PublishState, ReceiptId};

type Chain = Arc<Mutex<Vec<AuditEvent>>>;

/// Reference to an event awaiting publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPublish {
    pub attestation_id: AttestationId,
    pub sequence_no: u64,
}

#[derive(Debug, Default)]
pub struct AuditTrail {
    chains: RwLock<HashMap<AttestationId, Chain>>,
    pending: Mutex<VecDeque<PendingPublish>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    fn chain(&self, id: &AttestationId) -> Option<Chain> {
        self.chains.read().get(id).cloned()
    }

    fn chain_or_insert(&self, id: &AttestationId) -> Chain {
        if let Some(chain) = self.chain(id) {
            return chain;
        }
        self.chains.write().entry(*id).or_default().clone()
    }

    /// Append a new event to the attestation's chain.
    pub fn append(
        &self,
        attestation_id: AttestationId,
        event_type: AuditEventType,
        payload: Value,
    ) -> Result<AuditEvent, AuditError> {
        let chain = self.chain_or_insert(&attestation_id);
        let mut events = chain.lock();

        let sequence_no = events.len() as u64;
        let previous_hash = events.last().map(|e| e.event_hash).unwrap_or(ContentDigest::ZERO);
        let created_at = Timestamp::now();
        let event_hash = link_hash(
            &previous_hash,
            event_type,
            &attestation_id,
            sequence_no,
            &created_at,
            &payload,
        )?;

        let event = AuditEvent {
            attestation_id,
            sequence_no,
            event_type,
            payload,
            previous_hash,
            event_hash,
            created_at,
            external_receipt: None,
            publish_state: PublishState::Pending,
        };
        events.push(event.clone());
        self.pending.lock().push_back(PendingPublish {
            attestation_id,
            sequence_no,
        });

        tracing::debug!(
            attestation_id = %attestation_id,
            sequence_no,
            event_type = %event_type,
            event_hash = %event_hash,
            "audit event appended"
        );
        Ok(event)
    }

    /// Snapshot of the chain, oldest first.
    pub fn events(&self, attestation_id: &AttestationId) -> Vec<AuditEvent> {
        self.chain(attestation_id)
            .map(|c| c.lock().clone())
            .unwrap_or_default()
    }

    pub fn event(&self, attestation_id: &AttestationId, sequence_no: u64) -> Option<AuditEvent> {
        let chain = self.chain(attestation_id)?;
        let events = chain.lock();
        usize::try_from(sequence_no)
            .ok()
            .and_then(|i| events.get(i).cloned())
    }

    pub fn attestation_ids(&self) -> Vec<AttestationId> {
        let mut ids: Vec<AttestationId> = self.chains.read().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Recompute the chain from sequence 0.
    pub fn check_chain(&self, attestation_id: &AttestationId) -> Result<(), ChainIntegrityError> {
        let Some(chain) = self.chain(attestation_id) else {
            return Ok(());
        };
        let events = chain.lock();
        let result = check_events(attestation_id, &events);
        if let Err(e) = &result {
            tracing::error!(error = %e, "audit chain integrity failure");
        }
        result
    }

    pub fn verify_chain(&self, attestation_id: &AttestationId) -> bool {
        self.check_chain(attestation_id).is_ok()
    }

    /// Load a persisted chain. Rejected unless it verifies; a verified
    /// chain replaces whatever is held for the id, and its still-pending
    /// events are queued for publication.
    pub fn restore(
        &self,
        attestation_id: AttestationId,
        events: Vec<AuditEvent>,
    ) -> Result<(), AuditError> {
        check_events(&attestation_id, &events)?;
        let pending: Vec<PendingPublish> = events
            .iter()
            .filter(|e| e.is_pending())
            .map(|e| PendingPublish {
                attestation_id,
                sequence_no: e.sequence_no,
            })
            .collect();

        let chain = self.chain_or_insert(&attestation_id);
        let mut held = chain.lock();
        *held = events;
        let mut queue = self.pending.lock();
        queue.retain(|p| p.attestation_id != attestation_id);
        queue.extend(pending);
        Ok(())
    }

    /// Record the ledger receipt for an event.
    ///
    /// Idempotent: the first receipt wins and later calls return `false`.
    pub fn attach_receipt(
        &self,
        attestation_id: &AttestationId,
        sequence_no: u64,
        receipt: ReceiptId,
    ) -> Result<bool, AuditError> {
        let not_found = || AuditError::EventNotFound {
            attestation_id: *attestation_id,
            sequence_no,
        };
        let chain = self.chain(attestation_id).ok_or_else(not_found)?;
        let mut events = chain.lock();
        let index = usize::try_from(sequence_no).map_err(|_| not_found())?;
        let event = events.get_mut(index).ok_or_else(not_found)?;
        if event.external_receipt.is_some() {
            return Ok(false);
        }
        event.external_receipt = Some(receipt);
        event.publish_state = PublishState::Published;
        Ok(true)
    }

    /// Remove and return everything currently queued for publication.
    pub fn take_pending(&self) -> Vec<PendingPublish> {
        self.pending.lock().drain(..).collect()
    }

    pub fn enqueue(&self, item: PendingPublish) {
        self.pending.lock().push_back(item);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn with_events_mut(&self, id: &AttestationId, f: impl FnOnce(&mut Vec<AuditEvent>)) {
        if let Some(chain) = self.chain(id) {
            f(&mut chain.lock());
        }
    }
}

/// Verify a sequence of events as the complete chain of `attestation_id`.
///
/// Per event, in order: the stored `previous_hash` must equal the prior
/// event's hash, the stored `event_hash` must recompute from the stored
/// fields, and the event must sit at its own position (sequence number and
/// owning id). The first divergence is reported.
pub fn check_events(
    attestation_id: &AttestationId,
    events: &[AuditEvent],
) -> Result<(), ChainIntegrityError> {
    let mut previous = ContentDigest::ZERO;
    for (index, event) in events.iter().enumerate() {
        let sequence_no = index as u64;
        let fault = |field, expected, actual| ChainIntegrityError {
            attestation_id: *attestation_id,
            sequence_no,
            field,
            expected,
            actual,
        };
        if event.previous_hash != previous {
            return Err(fault("previous_hash", previous, event.previous_hash));
        }
        let recomputed = recompute(&previous, event, &event.attestation_id, event.sequence_no);
        if event.event_hash != recomputed {
            return Err(fault("event_hash", recomputed, event.event_hash));
        }
        if event.sequence_no != sequence_no || event.attestation_id != *attestation_id {
            let positional = recompute(&previous, event, attestation_id, sequence_no);
            return Err(fault("position", positional, event.event_hash));
        }
        previous = event.event_hash;
    }
    Ok(())
}

fn recompute(
    previous: &ContentDigest,
    event: &AuditEvent,
    attestation_id: &AttestationId,
    sequence_no: u64,
) -> ContentDigest {
    // A payload that no longer canonicalizes cannot reproduce its hash.
    link_hash(
        previous,
        event.event_type,
        attestation_id,
        sequence_no,
        &event.created_at,
        &event.payload,
    )
    .unwrap_or(ContentDigest::ZERO)
}
