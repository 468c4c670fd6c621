//! In-memory storage, for tests and embedding.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Snapshot, SnapshotKey, WatchList};
use crate::storage::{SnapshotStore, WatchListProvider, WatchListStore, upsert};

/// Mutex-guarded maps implementing every storage trait.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    snapshots: Mutex<HashMap<SnapshotKey, Snapshot>>,
    lists: Mutex<Vec<WatchList>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage pre-populated with watch lists.
    pub fn with_watch_lists(lists: Vec<WatchList>) -> Self {
        Self {
            snapshots: Mutex::default(),
            lists: Mutex::new(lists),
        }
    }

    /// Number of stored snapshots.
    pub fn snapshot_count(&self) -> usize {
        lock(&self.snapshots).len()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStorage {
    async fn get(&self, key: &SnapshotKey) -> Result<Option<Snapshot>> {
        Ok(lock(&self.snapshots).get(key).cloned())
    }

    async fn put(&self, key: &SnapshotKey, snapshot: &Snapshot) -> Result<()> {
        lock(&self.snapshots).insert(key.clone(), snapshot.clone());
        Ok(())
    }

    async fn delete(&self, key: &SnapshotKey) -> Result<()> {
        lock(&self.snapshots).remove(key);
        Ok(())
    }
}

#[async_trait]
impl WatchListProvider for MemoryStorage {
    async fn enumerate_all(&self) -> Result<Vec<WatchList>> {
        Ok(lock(&self.lists).clone())
    }
}

#[async_trait]
impl WatchListStore for MemoryStorage {
    async fn load(&self, user_id: &str) -> Result<WatchList> {
        Ok(lock(&self.lists)
            .iter()
            .find(|l| l.user_id == user_id)
            .cloned()
            .unwrap_or_else(|| WatchList::new(user_id)))
    }

    async fn save(&self, list: &WatchList) -> Result<()> {
        upsert(&mut lock(&self.lists), list);
        Ok(())
    }
}
