//! Checkpoint persistence — the indexer's durable resume position.
//!
//! The checkpoint is a single integer: the highest block height that has
//! been fully indexed and committed. It is read once at startup and
//! rewritten after every committed block (or batch). On restart the loop
//! resumes at `checkpoint + 1` rather than re-scanning the ledger.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::StorageError;

/// Durable storage for the indexing checkpoint.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the persisted height. `None` means nothing has been indexed yet.
    async fn load(&self) -> Result<Option<u64>, StorageError>;

    /// Persist `height` durably. Must not return before the value would
    /// survive a crash.
    async fn save(&self, height: u64) -> Result<(), StorageError>;
}

// ─── File-backed store ────────────────────────────────────────────────────────

/// File-backed checkpoint: a human-readable decimal height.
///
/// Writes go to a temporary sibling file, are flushed to disk, and then
/// renamed over the real file, so a crash mid-write leaves the previous
/// checkpoint intact.
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut p = self.path.clone();
        p.set_extension("tmp");
        p
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> Result<Option<u64>, StorageError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Checkpoint(e.to_string())),
        };
        let height = text
            .trim()
            .parse::<u64>()
            .map_err(|e| StorageError::Checkpoint(format!("unparsable checkpoint: {e}")))?;
        Ok(Some(height))
    }

    async fn save(&self, height: u64) -> Result<(), StorageError> {
        let tmp = self.tmp_path();
        let io_err = |e: std::io::Error| StorageError::Checkpoint(e.to_string());

        let mut file = std::fs::File::create(&tmp).map_err(io_err)?;
        writeln!(file, "{height}").map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;

        debug!(height, path = %self.path.display(), "checkpoint saved");
        Ok(())
    }
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

/// In-memory checkpoint store for tests and ephemeral indexers.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    height: Mutex<Option<u64>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> Result<Option<u64>, StorageError> {
        Ok(*self.height.lock())
    }

    async fn save(&self, height: u64) -> Result<(), StorageError> {
        *self.height.lock() = Some(height);
        Ok(())
    }
}
