//! DurableStore: table-level save and load over a snapshot backend

use recstore_core::Result;
use recstore_storage::RecordTable;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::backend::{FileBackend, MemoryBackend, SnapshotBackend};
use crate::format::{decode_snapshot, encode_snapshot};

/// Saves and restores whole record tables
///
/// Cloning is cheap; clones share the backend.
#[derive(Clone)]
pub struct DurableStore {
    backend: Arc<dyn SnapshotBackend>,
}

impl DurableStore {
    /// Wrap an arbitrary backend
    pub fn new(backend: Arc<dyn SnapshotBackend>) -> Self {
        DurableStore { backend }
    }

    /// Store backed by snapshot files under `dir`
    pub fn file(dir: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(Arc::new(FileBackend::new(dir)?)))
    }

    /// Store that keeps snapshots in memory only
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Encode `table` and replace the snapshot stored under `name`
    ///
    /// On error the previous snapshot is untouched.
    pub fn save(&self, name: &str, table: &RecordTable) -> Result<()> {
        let bytes = encode_snapshot(table)?;
        self.backend.write(name, &bytes).map_err(|e| {
            warn!(collection = name, error = %e, "Snapshot save failed");
            e
        })?;
        debug!(collection = name, records = table.len(), "Saved snapshot");
        Ok(())
    }

    /// Load the snapshot stored under `name`
    ///
    /// `Ok(None)` means nothing has been saved yet. Damaged data is an error,
    /// never an empty table.
    pub fn load(&self, name: &str) -> Result<Option<RecordTable>> {
        let bytes = match self.backend.read(name)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let (header, table) = decode_snapshot(&bytes).map_err(|e| {
            warn!(collection = name, error = %e, "Snapshot load failed");
            e
        })?;
        debug!(
            collection = name,
            records = table.len(),
            taken_at_micros = header.timestamp_micros,
            "Loaded snapshot"
        );
        Ok(Some(table))
    }

    /// True if a snapshot exists under `name`
    pub fn exists(&self, name: &str) -> bool {
        self.backend.exists(name)
    }

    /// Where the snapshot for `name` lives
    pub fn location(&self, name: &str) -> String {
        self.backend.location(name)
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore")
            .field("location", &self.backend.location("*"))
            .finish()
    }
}
