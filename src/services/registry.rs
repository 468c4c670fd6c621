//! Per-user URL registration.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Messages, SnapshotKey};
use crate::storage::{SnapshotStore, WatchListStore};
use crate::utils::parse_watch_url;

/// Result of registering a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Appended at the given 1-based position
    Added { index: usize, url: String },
    AlreadyRegistered { url: String },
}

/// Register, list and remove the URLs a user watches.
pub struct WatchRegistry {
    lists: Arc<dyn WatchListStore>,
    snapshots: Arc<dyn SnapshotStore>,
    messages: Messages,
}

impl WatchRegistry {
    pub fn new(
        lists: Arc<dyn WatchListStore>,
        snapshots: Arc<dyn SnapshotStore>,
        messages: Messages,
    ) -> Self {
        Self {
            lists,
            snapshots,
            messages,
        }
    }

    /// Register `text` as a URL for `user_id`.
    ///
    /// The URL is stored in its parsed, normalized form, so
    /// `https://example.com` and `https://example.com/` are the same entry.
    pub async fn add(&self, user_id: &str, text: &str) -> Result<AddOutcome> {
        let url = parse_watch_url(text)?.to_string();
        let mut list = self.lists.load(user_id).await?;

        if list.contains(&url) {
            return Ok(AddOutcome::AlreadyRegistered { url });
        }

        list.urls.push(url.clone());
        self.lists.save(&list).await?;

        log::info!("{} registered {}", user_id, url);
        Ok(AddOutcome::Added {
            index: list.urls.len(),
            url,
        })
    }

    /// URLs registered by a user, in registration order.
    pub async fn list(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self.lists.load(user_id).await?.urls)
    }

    /// Numbered listing as shown to the user.
    pub async fn render_list(&self, user_id: &str) -> Result<String> {
        let urls = self.list(user_id).await?;
        if urls.is_empty() {
            return Ok(self.messages.no_urls.clone());
        }
        Ok(urls
            .iter()
            .enumerate()
            .map(|(i, url)| format!("{}: {}", i + 1, url))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Remove the URL at 1-based `index`, dropping its snapshot too.
    pub async fn remove(&self, user_id: &str, index: usize) -> Result<String> {
        let mut list = self.lists.load(user_id).await?;
        if index == 0 || index > list.urls.len() {
            return Err(AppError::validation(format!(
                "{} has no URL number {} (registered: {})",
                user_id,
                index,
                list.urls.len()
            )));
        }

        let url = list.urls[index - 1].clone();
        self.snapshots
            .delete(&SnapshotKey::new(user_id, &url))
            .await?;

        list.urls.remove(index - 1);
        self.lists.save(&list).await?;

        log::info!("{} removed {}", user_id, url);
        Ok(url)
    }
}
