//! ==============================================================================
//! store.rs - persisted reading history
//! ==============================================================================
//!
//! purpose:
//!     owns the on-disk history: one json array of readings, oldest first.
//!     both the fetch loop and the read api go through a HistoryStore handle
//!     instead of touching the file themselves.
//!
//! file semantics:
//!     - absent file == empty history
//!     - readers create it as `[]` on first touch (ensure_initialized)
//!     - loading never creates it; the first append writes it (and its
//!       parent directories) if no reader got there first
//!     - appends rewrite the whole file, pretty-printed, no temp file/rename
//!
//! locking:
//!     a tokio RwLock serializes access inside this process. loads and the
//!     existence check share the lock; appends and the bootstrap write take it
//!     exclusively, so a reader never sees a half-written file from our own
//!     writer. other processes are not coordinated with.
//!
//! relationships:
//!     - used by: fetcher.rs (append), api.rs (ensure_initialized + load)
//!     - uses: domain.rs (History, Reading)
//!
//! ==============================================================================

use crate::domain::{History, Reading};
use crate::error::StoreError;

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// result of a successful append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// history length after the append and trim
    pub len: usize,
    /// readings dropped from the front to stay within capacity
    pub evicted: usize,
}

/// storage backend for the reading history
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// read the whole history. a missing store is an empty history.
    async fn load(&self) -> Result<History, StoreError>;

    /// make sure the store exists, creating it empty if needed
    async fn ensure_initialized(&self) -> Result<(), StoreError>;

    /// replace the stored history
    async fn save(&self, history: &History) -> Result<(), StoreError>;

    /// load, append `reading`, trim to capacity and save.
    ///
    /// backends that can be written concurrently should override this to
    /// hold their write guard across the whole step.
    async fn append(&self, reading: Reading) -> Result<AppendOutcome, StoreError> {
        let mut history = self.load().await?;
        let evicted = history.push_capped(reading, self.max_entries());
        self.save(&history).await?;
        Ok(AppendOutcome {
            len: history.len(),
            evicted,
        })
    }

    /// the capacity appends trim to
    fn max_entries(&self) -> usize;
}

// ==============================================================================
// json file store
// ==============================================================================

pub struct JsonFileStore {
    path: PathBuf,
    max_entries: usize,
    lock: RwLock<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            path: path.into(),
            max_entries,
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_unlocked(&self) -> Result<History, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(History::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_unlocked(&self, bytes: &[u8]) -> Result<(), StoreError> {
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| StoreError::io(&self.path, e))
    }

    async fn exists_unlocked(&self) -> Result<bool, StoreError> {
        tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))
    }

    async fn create_parent_dirs(&self) -> Result<(), StoreError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e)),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl HistoryStore for JsonFileStore {
    async fn load(&self) -> Result<History, StoreError> {
        let _guard = self.lock.read().await;
        self.read_unlocked().await
    }

    async fn ensure_initialized(&self) -> Result<(), StoreError> {
        {
            let _guard = self.lock.read().await;
            if self.exists_unlocked().await? {
                return Ok(());
            }
        }

        let _guard = self.lock.write().await;
        // another caller may have created it while we waited
        if self.exists_unlocked().await? {
            return Ok(());
        }

        self.create_parent_dirs().await?;
        self.write_unlocked(b"[]").await?;
        tracing::info!(path = %self.path.display(), "created empty history file");
        Ok(())
    }

    async fn save(&self, history: &History) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(history).map_err(StoreError::Serialize)?;
        let _guard = self.lock.write().await;
        self.create_parent_dirs().await?;
        self.write_unlocked(&bytes).await
    }

    async fn append(&self, reading: Reading) -> Result<AppendOutcome, StoreError> {
        let _guard = self.lock.write().await;

        let mut history = self.read_unlocked().await?;
        let evicted = history.push_capped(reading, self.max_entries);

        let bytes = serde_json::to_vec_pretty(&history).map_err(StoreError::Serialize)?;
        self.create_parent_dirs().await?;
        self.write_unlocked(&bytes).await?;

        Ok(AppendOutcome {
            len: history.len(),
            evicted,
        })
    }

    fn max_entries(&self) -> usize {
        self.max_entries
    }
}
