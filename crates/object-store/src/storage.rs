//! Object storage backend abstraction (S3/MinIO/local filesystem/memory).

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore as Backend;
use serde::{Deserialize, Serialize};

use crate::error::{BlobStoreError, Result};

/// Configuration for the object storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    /// In-memory storage (for testing)
    #[default]
    Memory,

    /// Local filesystem storage
    Local {
        /// Path to the storage directory
        path: PathBuf,
    },

    /// S3-compatible storage (AWS S3, MinIO, etc.)
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        endpoint: String,
        /// Access key ID
        access_key: String,
        /// Secret access key
        secret_key: String,
        /// Bucket name
        bucket: String,
        /// Optional region (defaults to "us-east-1")
        region: Option<String>,
    },
}

/// Key-addressed byte storage over one of the configured backends.
///
/// Keys are relative `/`-separated paths such as `data/<unit id>` or
/// `failed/<deposit id>/package`. Cloning is cheap; clones share the backend.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    inner: Arc<dyn Backend>,
}

impl ObjectStore {
    /// Create a new storage backend from configuration.
    pub async fn new(config: ObjectStoreConfig) -> Result<Self> {
        let inner: Arc<dyn Backend> = match &config {
            ObjectStoreConfig::Memory => Arc::new(InMemory::new()),

            ObjectStoreConfig::Local { path } => {
                tokio::fs::create_dir_all(path).await?;
                Arc::new(
                    LocalFileSystem::new_with_prefix(path)
                        .map_err(|e| BlobStoreError::InvalidConfig(e.to_string()))?,
                )
            }

            ObjectStoreConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region,
            } => {
                let builder = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(region.as_deref().unwrap_or("us-east-1"))
                    .with_allow_http(endpoint.starts_with("http://"));

                let store: Arc<dyn Backend> = Arc::new(
                    builder
                        .build()
                        .map_err(|e| BlobStoreError::InvalidConfig(e.to_string()))?,
                );

                // Fail fast if the bucket doesn't exist
                let prefix = ObjectPath::from("");
                let first = store.list(Some(&prefix)).try_next().await;
                match first {
                    Ok(_) => {}
                    Err(object_store::Error::NotFound { .. }) => {
                        return Err(BlobStoreError::BucketNotFound(bucket.clone()));
                    }
                    Err(e) => {
                        if e.to_string().contains("NoSuchBucket") {
                            return Err(BlobStoreError::BucketNotFound(bucket.clone()));
                        }
                        return Err(e.into());
                    }
                }

                store
            }
        };

        tracing::debug!(?config, "object store backend ready");
        Ok(Self { inner })
    }

    /// An in-memory store, used by tests and ephemeral servers.
    pub fn memory() -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
        }
    }

    fn path(key: &str) -> Result<ObjectPath> {
        let trimmed = key.trim_matches('/');
        if trimmed.is_empty() || trimmed.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(BlobStoreError::InvalidKey(key.to_string()));
        }
        Ok(ObjectPath::from(trimmed))
    }

    /// Write `data` under `key`, replacing anything already there.
    pub async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = Self::path(key)?;
        self.inner.put(&path, data.into()).await?;
        Ok(())
    }

    /// Read the bytes stored under `key`, if any.
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let path = Self::path(key)?;
        match self.inner.get(&path).await {
            Ok(result) => Ok(Some(result.bytes().await?)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete `key`. Deleting a missing key is not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let path = Self::path(key)?;
        match self.inner.delete(&path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether `key` exists.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let path = Self::path(key)?;
        match self.inner.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// List every key below `prefix`, sorted.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = Self::path(prefix)?;
        let items: Vec<_> = self.inner.list(Some(&prefix)).try_collect().await?;

        let mut keys: Vec<String> = items
            .into_iter()
            .map(|meta| meta.location.as_ref().to_string())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
