//! # Publish Worker
//!
//! Drains the audit trail's pending queue into a [`LedgerPublisher`].
//!
//! Each queued event gets up to `max_attempts` timeout-bounded publish
//! calls, with exponential backoff between them. On success the receipt is
//! attached to the event. When every attempt fails the event stays
//! `pending` and goes back on the queue for the next pass. Delivery is
//! at-least-once: a ledger may see the same bytes twice, but the local chain
//! is never reordered or duplicated, and only the first receipt is kept.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::publish::LedgerPublisher;
use crate::trail::{AuditTrail, PendingPublish};

/// Lifetime counters, updated lock-free.
#[derive(Debug, Default)]
pub struct PublishStats {
    published: AtomicU64,
    failed_calls: AtomicU64,
    timeouts: AtomicU64,
    requeued: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublishStatsSnapshot {
    pub published: u64,
    pub failed_calls: u64,
    pub timeouts: u64,
    pub requeued: u64,
}

impl PublishStats {
    pub fn snapshot(&self) -> PublishStatsSnapshot {
        PublishStatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
        }
    }
}

/// Result of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub published: usize,
    /// Already had a receipt (e.g. published by an earlier pass).
    pub skipped: usize,
    pub requeued: usize,
}

enum Outcome {
    Published,
    Skipped,
    Requeued,
}

pub struct PublishWorker<P: LedgerPublisher> {
    trail: Arc<AuditTrail>,
    publisher: Arc<P>,
    config: PublishConfig,
    stats: Arc<PublishStats>,
}

impl<P: LedgerPublisher> PublishWorker<P> {
    pub fn new(trail: Arc<AuditTrail>, publisher: Arc<P>, config: PublishConfig) -> Self {
        Self {
            trail,
            publisher,
            config,
            stats: Arc::new(PublishStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<PublishStats> {
        Arc::clone(&self.stats)
    }

    /// Publish everything queued at the start of the pass.
    pub async fn drain(&self) -> DrainReport {
        let mut report = DrainReport::default();
        for item in self.trail.take_pending() {
            match self.publish_one(item).await {
                Outcome::Published => report.published += 1,
                Outcome::Skipped => report.skipped += 1,
                Outcome::Requeued => report.requeued += 1,
            }
        }
        if report != DrainReport::default() {
            tracing::info!(
                published = report.published,
                skipped = report.skipped,
                requeued = report.requeued,
                "publish pass complete"
            );
        }
        report
    }

    /// Drain repeatedly until `shutdown` flips to `true`.
    pub async fn run(self, poll_interval: std::time::Duration, mut shutdown: watch::Receiver<bool>) {
        loop {
            self.drain().await;
            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("publish worker stopped");
    }

    async fn publish_one(&self, item: PendingPublish) -> Outcome {
        let Some(event) = self.trail.event(&item.attestation_id, item.sequence_no) else {
            tracing::warn!(
                attestation_id = %item.attestation_id,
                sequence_no = item.sequence_no,
                "queued audit event no longer exists, dropping"
            );
            return Outcome::Skipped;
        };
        if !event.is_pending() {
            return Outcome::Skipped;
        }
        let bytes = match event.ledger_bytes() {
            Ok(b) => b,
            Err(e) => {
                // Events were canonicalized on append; this cannot recover by retrying.
                tracing::error!(
                    attestation_id = %item.attestation_id,
                    sequence_no = item.sequence_no,
                    error = %e,
                    "audit event cannot be encoded for publication"
                );
                return Outcome::Skipped;
            }
        };

        for attempt in 0..self.config.max_attempts {
            let result =
                match tokio::time::timeout(self.config.call_timeout, self.publisher.publish(bytes.clone())).await {
                    Ok(result) => result,
                    Err(_) => Err(PublishError::Timeout(self.config.call_timeout)),
                };
            match result {
                Ok(receipt) => {
                    match self.trail.attach_receipt(&item.attestation_id, item.sequence_no, receipt) {
                        Ok(true) => {
                            self.stats.published.fetch_add(1, Ordering::Relaxed);
                            return Outcome::Published;
                        }
                        Ok(false) => return Outcome::Skipped,
                        Err(e) => {
                            tracing::warn!(error = %e, "receipt could not be attached");
                            return Outcome::Skipped;
                        }
                    }
                }
                Err(e) => {
                    if matches!(e, PublishError::Timeout(_)) {
                        self.stats.timeouts.fetch_add(1, Ordering::Relaxed);
                    } else {
                        self.stats.failed_calls.fetch_add(1, Ordering::Relaxed);
                    }
                    if attempt + 1 < self.config.max_attempts {
                        let delay = self.config.backoff(attempt);
                        tracing::warn!(
                            attestation_id = %item.attestation_id,
                            sequence_no = item.sequence_no,
                            attempt = attempt + 1,
                            max_attempts = self.config.max_attempts,
                            "ledger publish failed, retrying in {delay:?}: {e}"
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        tracing::warn!(
                            attestation_id = %item.attestation_id,
                            sequence_no = item.sequence_no,
                            "ledger publish failed after {} attempts, leaving pending: {e}",
                            self.config.max_attempts
                        );
                    }
                }
            }
        }

        self.trail.enqueue(item);
        self.stats.requeued.fetch_add(1, Ordering::Relaxed);
        Outcome::Requeued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{AuditEventType, PublishState, ReceiptId};
    use attest_core::AttestationId;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    /// Fails the first `failures` calls, then returns sequential receipts.
    struct FlakyLedger {
        failures: u32,
        calls: AtomicU32,
        seen: Mutex<Vec<Vec<u8>>>,
    }

    impl FlakyLedger {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl LedgerPublisher for FlakyLedger {
        async fn publish(&self, bytes: Vec<u8>) -> Result<ReceiptId, PublishError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(PublishError::Unavailable("ledger down".into()));
            }
            self.seen.lock().push(bytes);
            Ok(ReceiptId(format!("rcpt-{n}")))
        }
    }

    /// Never answers.
    struct StalledLedger;

    impl LedgerPublisher for StalledLedger {
        async fn publish(&self, _bytes: Vec<u8>) -> Result<ReceiptId, PublishError> {
            std::future::pending::<()>().await;
            Err(PublishError::Unavailable("unreachable".into()))
        }
    }

    fn fast_config(max_attempts: u32) -> PublishConfig {
        PublishConfig {
            max_attempts,
            base_delay: Duration::from_millis(1),
            call_timeout: Duration::from_millis(50),
        }
    }

    fn trail_with_events(n: usize) -> (Arc<AuditTrail>, AttestationId) {
        let trail = Arc::new(AuditTrail::new());
        let id = AttestationId::new();
        for i in 0..n {
            trail
                .append(id, AuditEventType::Signed, serde_json::json!({"i": i}))
                .unwrap();
        }
        (trail, id)
    }

    #[tokio::test]
    async fn publishes_and_attaches_receipts() {
        let (trail, id) = trail_with_events(3);
        let ledger = Arc::new(FlakyLedger::new(0));
        let worker = PublishWorker::new(Arc::clone(&trail), Arc::clone(&ledger), fast_config(3));

        let report = worker.drain().await;
        assert_eq!(report.published, 3);
        assert_eq!(trail.pending_len(), 0);
        for e in trail.events(&id) {
            assert_eq!(e.publish_state, PublishState::Published);
            assert!(e.external_receipt.is_some());
        }
        assert!(trail.verify_chain(&id));
        assert_eq!(ledger.seen.lock().len(), 3);
        assert_eq!(worker.stats().snapshot().published, 3);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_with_backoff() {
        let (trail, id) = trail_with_events(1);
        let ledger = Arc::new(FlakyLedger::new(2));
        let worker = PublishWorker::new(Arc::clone(&trail), ledger, fast_config(3));

        let report = worker.drain().await;
        assert_eq!(report.published, 1);
        assert_eq!(worker.stats().snapshot().failed_calls, 2);
        assert_eq!(trail.event(&id, 0).unwrap().external_receipt, Some(ReceiptId("rcpt-2".into())));
    }

    #[tokio::test]
    async fn exhausted_attempts_leave_event_pending_and_queued() {
        let (trail, id) = trail_with_events(1);
        let ledger = Arc::new(FlakyLedger::new(10));
        let worker = PublishWorker::new(Arc::clone(&trail), ledger, fast_config(2));

        let report = worker.drain().await;
        assert_eq!(report.requeued, 1);
        assert!(trail.event(&id, 0).unwrap().is_pending());
        assert_eq!(trail.pending_len(), 1);
    }

    #[tokio::test]
    async fn timed_out_publish_leaves_event_pending() {
        let (trail, id) = trail_with_events(1);
        let worker = PublishWorker::new(Arc::clone(&trail), Arc::new(StalledLedger), fast_config(1));

        let report = worker.drain().await;
        assert_eq!(report.requeued, 1);
        assert_eq!(worker.stats().snapshot().timeouts, 1);
        assert!(trail.event(&id, 0).unwrap().is_pending());
    }

    #[tokio::test]
    async fn already_published_events_are_skipped() {
        let (trail, id) = trail_with_events(1);
        trail.attach_receipt(&id, 0, ReceiptId("manual".into())).unwrap();
        let ledger = Arc::new(FlakyLedger::new(0));
        let worker = PublishWorker::new(Arc::clone(&trail), Arc::clone(&ledger), fast_config(1));

        let report = worker.drain().await;
        assert_eq!(report.skipped, 1);
        assert!(ledger.seen.lock().is_empty());
        assert_eq!(trail.event(&id, 0).unwrap().external_receipt, Some(ReceiptId("manual".into())));
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (trail, _id) = trail_with_events(2);
        let worker = PublishWorker::new(Arc::clone(&trail), Arc::new(FlakyLedger::new(0)), fast_config(1));
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(worker.run(Duration::from_millis(5), rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert_eq!(trail.pending_len(), 0);
    }
}
