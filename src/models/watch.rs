//! Watch list data structures.

use serde::{Deserialize, Serialize};

/// All URLs a single user has registered, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchList {
    pub user_id: String,

    #[serde(default)]
    pub urls: Vec<String>,
}

impl WatchList {
    /// Create an empty list for a user.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            urls: Vec::new(),
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.iter().any(|u| u == url)
    }

    /// Iterate the (user, URL) pairs of this list.
    pub fn watched(&self) -> impl Iterator<Item = WatchedUrl> + '_ {
        self.urls.iter().map(|url| WatchedUrl {
            user_id: self.user_id.clone(),
            url: url.clone(),
        })
    }
}

/// A single (user, URL) pair checked by the detector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchedUrl {
    pub user_id: String,
    pub url: String,
}

/// Flatten every user's list into (user, URL) pairs.
pub fn flatten(lists: &[WatchList]) -> Vec<WatchedUrl> {
    lists.iter().flat_map(WatchList::watched).collect()
}
