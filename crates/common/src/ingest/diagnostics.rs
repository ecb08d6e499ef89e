use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use object_store_backend::{BlobStoreError, ObjectStore};

use crate::error::SwordError;
use crate::model::{ContainerId, DepositPackage};

#[derive(Debug, thiserror::Error)]
pub enum DiagnosticError {
    #[error("side store error: {0}")]
    Blob(#[from] BlobStoreError),
    #[error("failed to encode deposit metadata: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A deposit that failed ingest, as handed to the side store.
#[derive(Debug)]
pub struct FailedDeposit<'a> {
    pub package: &'a DepositPackage,
    pub container: ContainerId,
    pub depositor: Option<&'a str>,
    pub error: &'a SwordError,
}

/// Where a failed deposit was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainedPackage {
    pub prefix: String,
    pub keys: Vec<String>,
}

impl RetainedPackage {
    pub fn package_key(&self) -> String {
        format!("{}/package", self.prefix)
    }

    pub fn entry_key(&self) -> String {
        format!("{}/entry", self.prefix)
    }
}

/// Side store for packages that failed ingest.
#[async_trait]
pub trait DiagnosticStore: Send + Sync + Debug {
    async fn retain(&self, deposit: &FailedDeposit<'_>) -> Result<RetainedPackage, DiagnosticError>;
}

/// Writes failed deposits below `failed/<timestamp>-<package id>/`: the raw
/// payload as `package`, the descriptive part of a multipart submission as
/// `entry`, and what is known about the failure as `deposit.json`.
#[derive(Debug, Clone)]
pub struct ObjectDiagnosticStore {
    store: ObjectStore,
}

impl ObjectDiagnosticStore {
    pub fn new(store: ObjectStore) -> Self {
        Self { store }
    }

    /// Raw payload of a retained deposit.
    pub async fn payload(&self, retained: &RetainedPackage) -> Result<Option<Bytes>, DiagnosticError> {
        Ok(self.store.get(&retained.package_key()).await?)
    }

    pub async fn entry(&self, retained: &RetainedPackage) -> Result<Option<Bytes>, DiagnosticError> {
        Ok(self.store.get(&retained.entry_key()).await?)
    }

    /// Every key written for failed deposits.
    pub async fn keys(&self) -> Result<Vec<String>, DiagnosticError> {
        Ok(self.store.list("failed").await?)
    }
}

#[async_trait]
impl DiagnosticStore for ObjectDiagnosticStore {
    async fn retain(&self, deposit: &FailedDeposit<'_>) -> Result<RetainedPackage, DiagnosticError> {
        let package = deposit.package;
        let prefix = format!(
            "failed/{}-{}",
            Utc::now().format("%Y%m%dT%H%M%S"),
            package.id()
        );
        let mut retained = RetainedPackage {
            prefix,
            keys: Vec::new(),
        };

        let key = retained.package_key();
        self.store.put(&key, package.payload().clone()).await?;
        retained.keys.push(key);

        if let Some(entry) = package.entry_part() {
            let key = retained.entry_key();
            self.store.put(&key, entry.clone()).await?;
            retained.keys.push(key);
        }

        let meta = serde_json::json!({
            "container": deposit.container,
            "depositor": deposit.depositor,
            "error": deposit.error.to_string(),
            "package": package.descriptor(),
            "retained_at": Utc::now(),
        });
        let key = format!("{}/deposit.json", retained.prefix);
        self.store
            .put(&key, Bytes::from(serde_json::to_vec_pretty(&meta)?))
            .await?;
        retained.keys.push(key);

        Ok(retained)
    }
}
