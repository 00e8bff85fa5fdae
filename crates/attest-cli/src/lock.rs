//! Cross-process lock files, one per attestation id.
//!
//! Every `attest` invocation runs its own manager and audit trail over the
//! same data directory, so the manager's in-process id locks do not order
//! two invocations against each other. A `<id>.lock` file opened with
//! `create_new` does: whoever creates it owns the id until the [`IdLock`]
//! is dropped and the file removed.
//!
//! A holder killed without unwinding leaves its file behind. The next
//! invocation times out with an error naming the file.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context as _, Result};
use attest_core::AttestationId;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Exclusive hold on one attestation id across processes.
#[derive(Debug)]
pub struct IdLock {
    path: PathBuf,
}

impl IdLock {
    /// Create `<dir>/<id>.lock`, waiting up to `timeout` for a current
    /// holder to release it.
    pub fn acquire(dir: &Path, id: &AttestationId, timeout: Duration) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating lock directory {}", dir.display()))?;
        let path = dir.join(format!("{id}.lock"));
        let deadline = Instant::now() + timeout;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    // Holder pid, for diagnosing a stale lock.
                    if let Err(e) = writeln!(file, "{}", std::process::id()) {
                        tracing::debug!(path = %path.display(), error = %e, "lock file pid not written");
                    }
                    tracing::debug!(attestation_id = %id, path = %path.display(), "id lock acquired");
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        bail!(
                            "attestation {id} is locked by another invocation ({}); \
                             remove the file if no attest process is running",
                            path.display()
                        );
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("creating lock file {}", path.display()))
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for IdLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "lock file could not be removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_holder_times_out_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let id = AttestationId::new();
        let first = IdLock::acquire(dir.path(), &id, Duration::ZERO).unwrap();
        assert!(first.path().exists());

        let err = IdLock::acquire(dir.path(), &id, Duration::from_millis(50)).unwrap_err();
        assert!(err.to_string().contains("locked by another invocation"));

        drop(first);
        let again = IdLock::acquire(dir.path(), &id, Duration::ZERO).unwrap();
        drop(again);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn waiter_proceeds_once_holder_releases() {
        let dir = tempfile::tempdir().unwrap();
        let id = AttestationId::new();
        let held = IdLock::acquire(dir.path(), &id, Duration::ZERO).unwrap();
        let releaser = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(60));
            drop(held);
        });
        let waited = IdLock::acquire(dir.path(), &id, Duration::from_secs(5)).unwrap();
        releaser.join().unwrap();
        assert!(waited.path().exists());
    }

    #[test]
    fn different_ids_do_not_contend() {
        let dir = tempfile::tempdir().unwrap();
        let _a = IdLock::acquire(dir.path(), &AttestationId::new(), Duration::ZERO).unwrap();
        let _b = IdLock::acquire(dir.path(), &AttestationId::new(), Duration::ZERO).unwrap();
    }
}
