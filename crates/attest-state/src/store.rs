//! Persistence collaborator for serialized attestations.
//!
//! Stores hold opaque bytes keyed by id; (de)serialization belongs to the
//! manager. `save` replaces any previous value atomically with respect to
//! readers: a `load` sees either the old bytes or the new bytes, never a mix.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use attest_core::AttestationId;
use parking_lot::RwLock;

use crate::error::StoreError;

pub trait AttestationStore: Send + Sync {
    /// Bytes last saved for `id`, or `StoreError::NotFound`.
    fn load(&self, id: &AttestationId) -> Result<Vec<u8>, StoreError>;

    fn save(&self, id: &AttestationId, bytes: &[u8]) -> Result<(), StoreError>;

    /// Every stored id, sorted.
    fn list(&self) -> Result<Vec<AttestationId>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<AttestationId, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AttestationStore for InMemoryStore {
    fn load(&self, id: &AttestationId) -> Result<Vec<u8>, StoreError> {
        self.entries
            .read()
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(*id))
    }

    fn save(&self, id: &AttestationId, bytes: &[u8]) -> Result<(), StoreError> {
        self.entries.write().insert(*id, bytes.to_vec());
        Ok(())
    }

    fn list(&self) -> Result<Vec<AttestationId>, StoreError> {
        let mut ids: Vec<_> = self.entries.read().keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

/// One `<id>.json` file per attestation under a directory.
///
/// Writes go to a temporary file in the same directory which is then
/// renamed over the target, so a crash mid-write leaves the previous file.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &AttestationId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl AttestationStore for FileStore {
    fn load(&self, id: &AttestationId) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(id);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(*id)),
            Err(e) => Err(io_err(&path, e)),
        }
    }

    fn save(&self, id: &AttestationId, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(id);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| io_err(&self.dir, e))?;
        tmp.write_all(bytes).map_err(|e| io_err(tmp.path(), e))?;
        tmp.as_file().sync_all().map_err(|e| io_err(tmp.path(), e))?;
        tmp.persist(&path).map_err(|e| io_err(&path, e.error))?;
        tracing::debug!(attestation_id = %id, path = %path.display(), "attestation saved");
        Ok(())
    }

    fn list(&self) -> Result<Vec<AttestationId>, StoreError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| io_err(&self.dir, e))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            // Stray files that are not named by an id are ignored.
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| AttestationId::parse(s).ok())
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}
