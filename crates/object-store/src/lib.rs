//! Object Storage Backend
//!
//! A thin, key-addressed wrapper over the `object_store` crate. The deposit
//! service keeps two kinds of data here:
//!
//! - content-unit bytes, addressed by unit id
//! - copies of rejected deposit packages kept for operator inspection
//!
//! # Backends
//!
//! - in-memory (tests, ephemeral servers)
//! - local filesystem
//! - S3-compatible object storage (AWS S3, MinIO, ...)
//!
//! # Example
//!
//! ```rust,no_run
//! use object_store_backend::{ObjectStore, ObjectStoreConfig};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), object_store_backend::BlobStoreError> {
//! let store = ObjectStore::new(ObjectStoreConfig::Local {
//!     path: PathBuf::from("/tmp/sword"),
//! })
//! .await?;
//! store.put("data/abc", bytes::Bytes::from_static(b"hello")).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod storage;

pub use error::{BlobStoreError, Result};
pub use storage::{ObjectStore, ObjectStoreConfig};
