use std::sync::Arc;

use chrono::Utc;

use super::{AcceptPolicy, DiagnosticStore, FailedDeposit, IngesterRegistry};
use crate::error::SwordError;
use crate::model::{
    Container, ContainerId, ContentUnit, DepositPackage, DepositResult, UnitDraft, DEPOSIT_GROUP,
    ORIGINAL_GROUP,
};
use crate::store::{ensure_group, StoreScope};
use crate::trace::Trace;

/// Runs a deposit through policy checks and the ingester for its
/// packaging, then links the resulting units into the original group.
///
/// Rejected packages are copied to the diagnostic store when one is
/// configured. That copy is best effort: its own failure is logged and the
/// ingest error is returned untouched.
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    registry: Arc<IngesterRegistry>,
    policy: AcceptPolicy,
    diagnostics: Option<Arc<dyn DiagnosticStore>>,
    keep_original_package: bool,
}

impl IngestPipeline {
    pub fn new(registry: Arc<IngesterRegistry>, policy: AcceptPolicy) -> Self {
        Self {
            registry,
            policy,
            diagnostics: None,
            keep_original_package: false,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticStore>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Also store the raw package as a unit of the deposit group.
    pub fn keep_original_package(mut self, keep: bool) -> Self {
        self.keep_original_package = keep;
        self
    }

    pub fn policy(&self) -> &AcceptPolicy {
        &self.policy
    }

    /// Everything that can be decided about a package without touching
    /// the store.
    pub fn check_acceptable(&self, package: &DepositPackage) -> Result<(), SwordError> {
        self.policy.check(package)?;
        self.registry.select_by_packaging(package.packaging())?;
        Ok(())
    }

    /// [`IngestPipeline::check_acceptable`] for callers that must refuse a
    /// package before they start mutating. A refused package is retained
    /// like any other rejected deposit.
    pub async fn screen(
        &self,
        scope: &dyn StoreScope,
        container: ContainerId,
        package: &DepositPackage,
        trace: &mut Trace,
    ) -> Result<(), SwordError> {
        if let Err(err) = self.check_acceptable(package) {
            trace.append(format!("Deposit refused: {err}"));
            let depositor = scope.principal().map(|p| p.username.clone());
            self.retain_failed(depositor.as_deref(), container, package, &err, trace)
                .await;
            return Err(err);
        }
        Ok(())
    }

    pub async fn ingest(
        &self,
        scope: &mut dyn StoreScope,
        container: &Container,
        package: &DepositPackage,
        trace: &mut Trace,
    ) -> Result<DepositResult, SwordError> {
        match self.run(scope, container, package, trace).await {
            Ok(result) => Ok(result),
            Err(err) => {
                trace.append(format!("Ingest failed: {err}"));
                if err.is_ingest_rejection() {
                    let depositor = scope.principal().map(|p| p.username.clone());
                    self.retain_failed(depositor.as_deref(), container.id, package, &err, trace)
                        .await;
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        scope: &mut dyn StoreScope,
        container: &Container,
        package: &DepositPackage,
        trace: &mut Trace,
    ) -> Result<DepositResult, SwordError> {
        self.policy.check(package)?;
        let ingester = self.registry.select_by_packaging(package.packaging())?;
        trace.append(format!("Loaded ingester: {}", ingester.name()));

        let units = ingester.ingest(scope, package, &self.policy, trace).await?;

        let original = ensure_group(scope, container.id, ORIGINAL_GROUP).await?;
        for unit in &units {
            scope.link(original.id, unit.id).await?;
        }

        let stored_package = if self.keep_original_package {
            Some(self.store_package(scope, container, package, trace).await?)
        } else {
            None
        };

        let now = Utc::now();
        Ok(DepositResult {
            container: container.id,
            units,
            stored_package,
            ingester: ingester.name().to_string(),
            created: now,
            updated: now,
        })
    }

    async fn store_package(
        &self,
        scope: &mut dyn StoreScope,
        container: &Container,
        package: &DepositPackage,
        trace: &mut Trace,
    ) -> Result<ContentUnit, SwordError> {
        let name = match package.declared_filename() {
            Some(name) => format!("sword-{name}"),
            None => format!("sword-{}", package.id()),
        };
        let unit = scope
            .create_unit(UnitDraft::new(
                name,
                package.mime_type().clone(),
                package.payload().clone(),
            ))
            .await?;
        let group = ensure_group(scope, container.id, DEPOSIT_GROUP).await?;
        scope.link(group.id, unit.id).await?;

        trace.append(format!("Original package stored as {}", unit.name));
        Ok(unit)
    }

    async fn retain_failed(
        &self,
        depositor: Option<&str>,
        container: ContainerId,
        package: &DepositPackage,
        error: &SwordError,
        trace: &mut Trace,
    ) {
        let Some(diagnostics) = &self.diagnostics else {
            return;
        };

        let failed = FailedDeposit {
            package,
            container,
            depositor,
            error,
        };
        match diagnostics.retain(&failed).await {
            Ok(retained) => {
                tracing::info!(prefix = %retained.prefix, "retained failed deposit package");
                trace.append(format!("Failed deposit package stored at {}", retained.prefix));
            }
            Err(e) => {
                tracing::warn!(error = %e, package = %package.id(), "unable to retain failed deposit package");
                trace.append("Unable to store failed deposit package");
            }
        }
    }
}
