//! Snapshot backends
//!
//! A backend is the durable location snapshots are written to. It knows
//! nothing about the snapshot format; it only stores and returns named blobs.
//! A successful `write` must be fully visible to the next `read`, and a failed
//! one must leave the previous blob intact.

use parking_lot::RwLock;
use recstore_core::Result;
use rustc_hash::FxHashMap;
use std::fs::{self, File};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File extension of snapshot files
pub const SNAPSHOT_EXTENSION: &str = "snap";

/// Durable storage for named snapshot blobs
pub trait SnapshotBackend: Send + Sync {
    /// Replace the blob stored under `name`
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Fetch the blob stored under `name`, `None` if there is none
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// True if a blob is stored under `name`
    fn exists(&self, name: &str) -> bool;

    /// Human-readable location of the blob, for diagnostics
    fn location(&self, name: &str) -> String;
}

// ============================================================================
// File backend
// ============================================================================

/// Stores each snapshot as `<dir>/<name>.snap`
///
/// Writes go to a temp file that is synced and renamed over the target, so a
/// crash mid-write never exposes a partial snapshot.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Opened file snapshot backend");
        Ok(FileBackend { dir })
    }

    /// Root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the snapshot file for `name`
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, SNAPSHOT_EXTENSION))
    }

    fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(bytes)?;
        file.sync_all()
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let temp_path = path.with_extension("snap.tmp");

        debug!(
            final_path = %path.display(),
            temp_path = %temp_path.display(),
            "Starting atomic snapshot write"
        );

        if temp_path.exists() {
            warn!(path = %temp_path.display(), "Removing stale temp file");
            let _ = fs::remove_file(&temp_path);
        }

        if let Err(e) = Self::write_file(&temp_path, bytes) {
            warn!(
                temp_path = %temp_path.display(),
                error = %e,
                "Write failed, cleaning up temp file"
            );
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, path) {
            warn!(
                temp_path = %temp_path.display(),
                error = %e,
                "Rename failed, cleaning up temp file"
            );
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        info!(
            path = %path.display(),
            size_bytes = bytes.len(),
            "Snapshot written"
        );
        Ok(())
    }
}

impl SnapshotBackend for FileBackend {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.write_atomic(&self.path_for(name), bytes)
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(name);
        match fs::read(&path) {
            Ok(bytes) => {
                debug!(path = %path.display(), size_bytes = bytes.len(), "Read snapshot");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    fn location(&self, name: &str) -> String {
        self.path_for(name).display().to_string()
    }
}

// ============================================================================
// Memory backend
// ============================================================================

/// Keeps snapshots in process memory
///
/// Nothing survives the process. Used for ephemeral collections and tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    blobs: RwLock<FxHashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    /// Create an empty memory backend
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotBackend for MemoryBackend {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.blobs.write().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().get(name).cloned())
    }

    fn exists(&self, name: &str) -> bool {
        self.blobs.read().contains_key(name)
    }

    fn location(&self, name: &str) -> String {
        format!("memory:{}", name)
    }
}
