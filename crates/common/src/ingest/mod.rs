mod archive;
mod binary;
mod diagnostics;
mod pipeline;
mod policy;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

pub use archive::SimpleZipIngester;
pub use binary::BinaryIngester;
pub use diagnostics::{
    DiagnosticError, DiagnosticStore, FailedDeposit, ObjectDiagnosticStore, RetainedPackage,
};
pub use pipeline::IngestPipeline;
pub use policy::{AcceptPolicy, PolicyViolation};

use crate::error::SwordError;
use crate::model::{ContentUnit, DepositPackage};
use crate::store::StoreScope;
use crate::trace::Trace;

/// Turns one packaging format into stored content units. Linking the
/// units into groups is left to the pipeline.
///
/// The policy has already been checked against the package as received;
/// ingesters that expand a package must keep what they store within
/// `policy.max_upload_size` as well.
#[async_trait]
pub trait Ingester: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn packaging(&self) -> &str;

    async fn ingest(
        &self,
        scope: &mut dyn StoreScope,
        package: &DepositPackage,
        policy: &AcceptPolicy,
        trace: &mut Trace,
    ) -> Result<Vec<ContentUnit>, SwordError>;
}

#[derive(Debug, Clone, Default)]
pub struct IngesterRegistry {
    ingesters: Vec<Arc<dyn Ingester>>,
}

impl IngesterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binary and simple zip.
    pub fn with_defaults() -> Self {
        Self::new()
            .register(Arc::new(BinaryIngester))
            .register(Arc::new(SimpleZipIngester))
    }

    pub fn register(mut self, ingester: Arc<dyn Ingester>) -> Self {
        self.ingesters.push(ingester);
        self
    }

    pub fn select_by_packaging(&self, packaging: &str) -> Result<Arc<dyn Ingester>, PolicyViolation> {
        self.ingesters
            .iter()
            .find(|i| i.packaging() == packaging)
            .cloned()
            .ok_or_else(|| PolicyViolation::UnsupportedPackaging(packaging.to_string()))
    }

    pub fn packagings(&self) -> Vec<&str> {
        self.ingesters.iter().map(|i| i.packaging()).collect()
    }
}
