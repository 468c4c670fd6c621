//! Storage abstractions for snapshots and watch lists.
//!
//! Snapshots are keyed by [`SnapshotKey`] (`"{user}:{url}"`); a write always
//! replaces the whole previous snapshot. Watch lists hold every user's
//! registered URLs.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml           # Detector configuration
//! ├── watchlists.json       # All users' registered URLs
//! └── snapshots/
//!     └── {sha256(key)}.json
//! ```
//!
//! Every backend must be safe to share across concurrently running checks.

pub mod local;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Snapshot, SnapshotKey, WatchList};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Relative key of the watch list document.
pub const WATCHLISTS_KEY: &str = "watchlists.json";

/// Relative key of the snapshot document for a pair.
pub fn snapshot_key_path(key: &SnapshotKey) -> String {
    format!("snapshots/{}.json", key.digest())
}

/// Last-known extracted text per (user, URL) pair.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load a snapshot; `None` means the pair has never been stored.
    async fn get(&self, key: &SnapshotKey) -> Result<Option<Snapshot>>;

    /// Replace the snapshot for a pair.
    async fn put(&self, key: &SnapshotKey, snapshot: &Snapshot) -> Result<()>;

    /// Remove a snapshot; deleting a missing one is not an error.
    async fn delete(&self, key: &SnapshotKey) -> Result<()>;
}

/// Enumerates every user's registered URLs.
#[async_trait]
pub trait WatchListProvider: Send + Sync {
    async fn enumerate_all(&self) -> Result<Vec<WatchList>>;
}

/// Read/write access to individual watch lists.
#[async_trait]
pub trait WatchListStore: WatchListProvider {
    /// Load a user's list, empty if the user has none.
    async fn load(&self, user_id: &str) -> Result<WatchList>;

    /// Replace a user's list.
    async fn save(&self, list: &WatchList) -> Result<()>;
}

/// Insert or replace `list` within `lists`, keyed by user.
pub(crate) fn upsert(lists: &mut Vec<WatchList>, list: &WatchList) {
    match lists.iter_mut().find(|l| l.user_id == list.user_id) {
        Some(existing) => existing.urls = list.urls.clone(),
        None => lists.push(list.clone()),
    }
}
