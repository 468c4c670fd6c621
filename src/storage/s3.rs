//! AWS S3 storage implementation.
//!
//! Same document layout as [`LocalStorage`](super::LocalStorage), under
//! `s3://{bucket}/{prefix}/`. Each snapshot is one object, so a `put` either
//! replaces it entirely or fails.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{AppError, Result};
use crate::models::{Snapshot, SnapshotKey, SnapshotRecord, WatchList};
use crate::storage::{
    SnapshotStore, WATCHLISTS_KEY, WatchListProvider, WatchListStore, snapshot_key_path, upsert,
};

/// S3-backed snapshot and watch list storage.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    /// Create a new S3 storage instance.
    pub fn new(client: Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Create S3 storage from environment configuration.
    ///
    /// - `S3_BUCKET`: bucket name (default: `pagewatch`)
    /// - `S3_PREFIX`: key prefix (default: `pagewatch`)
    pub async fn from_env() -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&config);

        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "pagewatch".to_string());
        let prefix = std::env::var("S3_PREFIX").unwrap_or_else(|_| "pagewatch".to_string());
        if bucket.trim().is_empty() {
            return Err(AppError::config("S3_BUCKET is set but empty"));
        }

        Ok(Self::new(client, bucket, prefix))
    }

    /// Full object key for a relative key.
    fn object_key(&self, key: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", prefix, key)
        }
    }

    /// Read an object, returning None if it doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let object_key = self.object_key(key);
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| AppError::S3(e.to_string()))?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::debug!("No object at s3://{}/{}", self.bucket, object_key);
                    Ok(None)
                } else {
                    Err(AppError::S3(service_err.to_string()))
                }
            }
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(value)?;
        let object_key = self.object_key(key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(ByteStream::from(json))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| AppError::S3(e.to_string()))?;

        log::debug!("Wrote s3://{}/{}", self.bucket, object_key);
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for S3Storage {
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
        self.write_json(&snapshot_key_path(key), &record).await
    }

    async fn delete(&self, key: &SnapshotKey) -> Result<()> {
        let object_key = self.object_key(&snapshot_key_path(key));
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| AppError::S3(e.to_string()))?;

        log::info!("Deleted s3://{}/{}", self.bucket, object_key);
        Ok(())
    }
}

#[async_trait]
impl WatchListProvider for S3Storage {
    async fn enumerate_all(&self) -> Result<Vec<WatchList>> {
        match self.read_json(WATCHLISTS_KEY).await? {
            Some(lists) => Ok(lists),
            None => {
                log::warn!(
                    "No watch lists at s3://{}/{}",
                    self.bucket,
                    self.object_key(WATCHLISTS_KEY)
                );
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl WatchListStore for S3Storage {
    async fn load(&self, user_id: &str) -> Result<WatchList> {
        let lists: Vec<WatchList> = self.read_json(WATCHLISTS_KEY).await?.unwrap_or_default();
        Ok(lists
            .into_iter()
            .find(|l| l.user_id == user_id)
            .unwrap_or_else(|| WatchList::new(user_id)))
    }

    // TODO: use a conditional put (If-Match on the ETag) so concurrent
    // registrations from separate processes cannot drop each other's edits.
    async fn save(&self, list: &WatchList) -> Result<()> {
        let mut lists: Vec<WatchList> = self.read_json(WATCHLISTS_KEY).await?.unwrap_or_default();
        upsert(&mut lists, list);
        self.write_json(WATCHLISTS_KEY, &lists).await
    }
}
