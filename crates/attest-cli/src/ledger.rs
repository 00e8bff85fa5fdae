//! A [`LedgerPublisher`] that writes each event record to a directory.
//!
//! The file is named by the SHA-256 of the record bytes, and that digest is
//! the receipt. Publishing the same bytes twice rewrites the same file and
//! yields the same receipt.

use std::path::{Path, PathBuf};

use attest_audit::{LedgerPublisher, PublishError, ReceiptId};
use attest_core::Sha256Accumulator;

#[derive(Debug, Clone)]
pub struct DirectoryLedger {
    dir: PathBuf,
}

impl DirectoryLedger {
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl LedgerPublisher for DirectoryLedger {
    async fn publish(&self, bytes: Vec<u8>) -> Result<ReceiptId, PublishError> {
        let mut acc = Sha256Accumulator::new();
        acc.update(&bytes);
        let digest = acc.finalize_hex();
        let path = self.dir.join(format!("{digest}.json"));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| PublishError::Unavailable(format!("{}: {e}", path.display())))?;
        Ok(ReceiptId(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receipt_is_content_digest_and_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = DirectoryLedger::open(dir.path().join("ledger")).unwrap();
        let r1 = ledger.publish(b"{\"a\":1}".to_vec()).await.unwrap();
        let r2 = ledger.publish(b"{\"a\":1}".to_vec()).await.unwrap();
        assert_eq!(r1, r2);
        assert_eq!(r1.0.len(), 64);
        let stored = std::fs::read(ledger.dir().join(format!("{}.json", r1.0))).unwrap();
        assert_eq!(stored, b"{\"a\":1}");
        assert_eq!(std::fs::read_dir(ledger.dir()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn unwritable_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = DirectoryLedger::open(dir.path().join("gone")).unwrap();
        std::fs::remove_dir(ledger.dir()).unwrap();
        let err = ledger.publish(b"{}".to_vec()).await.unwrap_err();
        assert!(matches!(err, PublishError::Unavailable(_)));
    }
}
