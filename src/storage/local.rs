//! Local filesystem storage implementation.
//!
//! JSON documents under a root directory, written atomically (temp file,
//! then rename) so a snapshot is either fully replaced or left untouched.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{Snapshot, SnapshotKey, SnapshotRecord, WatchList};
use crate::storage::{
    SnapshotStore, WATCHLISTS_KEY, WatchListProvider, WatchListStore, snapshot_key_path, upsert,
};

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    /// Serializes read-modify-write of the watch list document
    watchlists_lock: Arc<Mutex<()>>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            watchlists_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SnapshotStore for LocalStorage {
    async fn get(&self, key: &SnapshotKey) -> Result<Option<Snapshot>> {
        let record: Option<SnapshotRecord> = self.read_json(&snapshot_key_path(key)).await?;
        match record {
            Some(record) if record.key != *key => Err(AppError::store(format!(
                "snapshot digest collision: {} stored where {} was expected",
                record.key, key
            ))),
            Some(record) => Ok(Some(record.into())),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &SnapshotKey, snapshot: &Snapshot) -> Result<()> {
        let record = SnapshotRecord::new(key, snapshot);
        self.write_json(&snapshot_key_path(key), &record).await?;
        log::debug!("Snapshot written for {} ({} bytes)", key, snapshot.text.len());
        Ok(())
    }

    async fn delete(&self, key: &SnapshotKey) -> Result<()> {
        match tokio::fs::remove_file(self.path(&snapshot_key_path(key))).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl WatchListProvider for LocalStorage {
    async fn enumerate_all(&self) -> Result<Vec<WatchList>> {
        match self.read_json(WATCHLISTS_KEY).await? {
            Some(lists) => Ok(lists),
            None => {
                log::warn!("No {} found", WATCHLISTS_KEY);
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl WatchListStore for LocalStorage {
    async fn load(&self, user_id: &str) -> Result<WatchList> {
        let lists: Vec<WatchList> = self.read_json(WATCHLISTS_KEY).await?.unwrap_or_default();
        Ok(lists
            .into_iter()
            .find(|l| l.user_id == user_id)
            .unwrap_or_else(|| WatchList::new(user_id)))
    }

    async fn save(&self, list: &WatchList) -> Result<()> {
        let _guard = self.watchlists_lock.lock().await;
        let mut lists: Vec<WatchList> = self.read_json(WATCHLISTS_KEY).await?.unwrap_or_default();
        upsert(&mut lists, list);
        self.write_json(WATCHLISTS_KEY, &lists).await
    }
}
