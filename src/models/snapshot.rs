//! Snapshot data structures.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Composite store key for one (user, URL) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotKey(String);

impl SnapshotKey {
    /// Build the key for a user and URL.
    pub fn new(user_id: &str, url: &str) -> Self {
        Self(format!("{user_id}:{url}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex SHA-256 of the key, safe as a file or object name.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Last successfully extracted text of a watched page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Watched URL
    pub url: String,

    /// Extracted plain text
    pub text: String,
}

impl Snapshot {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
        }
    }
}

/// On-disk form of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Composite key the record was written under
    pub key: SnapshotKey,

    pub url: String,

    pub text: String,

    /// When the snapshot was last written
    pub updated_at: DateTime<Utc>,
}

impl SnapshotRecord {
    pub fn new(key: &SnapshotKey, snapshot: &Snapshot) -> Self {
        Self {
            key: key.clone(),
            url: snapshot.url.clone(),
            text: snapshot.text.clone(),
            updated_at: Utc::now(),
        }
    }
}

impl From<SnapshotRecord> for Snapshot {
    fn from(record: SnapshotRecord) -> Self {
        Self {
            url: record.url,
            text: record.text,
        }
    }
}
