//! The external ledger seam. The core hands over canonical event bytes and
//! gets back an opaque receipt; how the ledger stores them is not its
//! concern.

use std::future::Future;

use crate::error::PublishError;
use crate::event::ReceiptId;

pub trait LedgerPublisher: Send + Sync + 'static {
    /// Publish one event record. May be retried with the same bytes.
    fn publish(&self, bytes: Vec<u8>) -> impl Future<Output = Result<ReceiptId, PublishError>> + Send;
}
