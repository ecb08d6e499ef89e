use chrono::Utc;

use crate::access::{AccessResolver, AccessTarget};
use crate::error::SwordError;
use crate::ingest::IngestPipeline;
use crate::model::{
    Container, ContainerId, ContentUnit, DepositPackage, DepositResult, Principal, UnitId,
    ORIGINAL_GROUP,
};
use crate::store::{containers_referencing, ensure_group, find_group, StoreError, StoreScope};
use crate::trace::Trace;

/// Outcome of replacing a unit shared by several containers.
#[derive(Debug, Clone)]
pub struct SharedReplace {
    pub result: DepositResult,
    /// Every container that referenced the old unit, in link order
    pub containers: Vec<ContainerId>,
    pub replaced: UnitId,
}

/// Replace and remove on top of a store that can only link, unlink,
/// create and destroy.
///
/// A replace of a shared unit removes it everywhere, ingests the new
/// package into the first referencing container and then links the new
/// units into the original group of the others. Between those steps a
/// container can briefly have nothing in its original group.
#[derive(Debug, Clone)]
pub struct VersioningCoordinator {
    access: AccessResolver,
    pipeline: IngestPipeline,
}

impl VersioningCoordinator {
    pub fn new(access: AccessResolver, pipeline: IngestPipeline) -> Self {
        Self { access, pipeline }
    }

    pub fn pipeline(&self) -> &IngestPipeline {
        &self.pipeline
    }

    /// Ingest a package alongside whatever the container already holds.
    pub async fn add_content(
        &self,
        scope: &mut dyn StoreScope,
        container: &Container,
        package: &DepositPackage,
        trace: &mut Trace,
    ) -> Result<DepositResult, SwordError> {
        let result = self.pipeline.ingest(scope, container, package, trace).await?;
        scope.touch(container.id, result.updated).await?;
        trace.append("Add completed successfully");
        Ok(result)
    }

    /// Empty the container's original group, then ingest the package.
    pub async fn replace_container_content(
        &self,
        scope: &mut dyn StoreScope,
        container: &Container,
        package: &DepositPackage,
        trace: &mut Trace,
    ) -> Result<DepositResult, SwordError> {
        self.pipeline
            .screen(&*scope, container.id, package, trace)
            .await?;

        let removed = self.clear_original_group(scope, container.id, trace).await?;
        self.destroy_orphans(scope, &removed, trace).await?;

        let result = self.pipeline.ingest(scope, container, package, trace).await?;
        scope.touch(container.id, result.updated).await?;
        trace.append("Replace completed successfully");
        Ok(result)
    }

    /// Empty the container's original group. Returns the removed units.
    pub async fn remove_container_content(
        &self,
        scope: &mut dyn StoreScope,
        container: &Container,
        trace: &mut Trace,
    ) -> Result<Vec<UnitId>, SwordError> {
        let removed = self.clear_original_group(scope, container.id, trace).await?;
        self.destroy_orphans(scope, &removed, trace).await?;
        scope.touch(container.id, Utc::now()).await?;
        trace.append("Delete completed successfully");
        Ok(removed)
    }

    /// Replace a unit in every container that references it.
    ///
    /// Write permission over all referencing containers, and acceptability
    /// of the package, are settled before anything is changed.
    pub async fn replace_shared_unit(
        &self,
        scope: &mut dyn StoreScope,
        principal: &Principal,
        unit: &ContentUnit,
        package: &DepositPackage,
        trace: &mut Trace,
    ) -> Result<SharedReplace, SwordError> {
        let containers = self.authorize_unit(&*scope, principal, unit, trace).await?;
        let mut records = Vec::with_capacity(containers.len());
        for id in &containers {
            let container = scope
                .container(*id)
                .await?
                .ok_or(StoreError::MissingContainer(*id))?;
            records.push(container);
        }
        let Some((first, rest)) = records.split_first() else {
            return Err(SwordError::not_found(format!("content unit {}", unit.id)));
        };

        for container in &records {
            self.pipeline.screen(&*scope, container.id, package, trace).await?;
        }

        for container in &records {
            self.unlink_from_container(scope, unit, container.id, trace)
                .await?;
        }
        self.destroy_orphans(scope, &[unit.id], trace).await?;

        let result = self.pipeline.ingest(scope, first, package, trace).await?;
        scope.touch(first.id, result.updated).await?;

        for container in rest {
            let original = ensure_group(scope, container.id, ORIGINAL_GROUP).await?;
            for created in &result.units {
                scope.link(original.id, created.id).await?;
            }
            scope.touch(container.id, result.updated).await?;
            trace.append(format!(
                "Linked {} new file(s) into container {}",
                result.units.len(),
                container.handle
            ));
        }

        trace.append("Replace completed successfully");
        Ok(SharedReplace {
            result,
            containers,
            replaced: unit.id,
        })
    }

    /// Remove a unit from every container that references it and destroy it.
    pub async fn remove_shared_unit(
        &self,
        scope: &mut dyn StoreScope,
        principal: &Principal,
        unit: &ContentUnit,
        trace: &mut Trace,
    ) -> Result<Vec<ContainerId>, SwordError> {
        let containers = self.authorize_unit(&*scope, principal, unit, trace).await?;

        let now = Utc::now();
        for container in &containers {
            self.unlink_from_container(scope, unit, *container, trace)
                .await?;
            scope.touch(*container, now).await?;
        }
        self.destroy_orphans(scope, &[unit.id], trace).await?;

        trace.append("Delete completed successfully");
        Ok(containers)
    }

    async fn authorize_unit(
        &self,
        scope: &dyn StoreScope,
        principal: &Principal,
        unit: &ContentUnit,
        trace: &mut Trace,
    ) -> Result<Vec<ContainerId>, SwordError> {
        let target = AccessTarget::Unit {
            unit: unit.clone(),
            containers: containers_referencing(scope, unit.id).await?,
        };
        let grant = self.access.require_write(principal, &target, trace).await?;
        Ok(grant.containers)
    }

    async fn clear_original_group(
        &self,
        scope: &mut dyn StoreScope,
        container: ContainerId,
        trace: &mut Trace,
    ) -> Result<Vec<UnitId>, SwordError> {
        let Some(group) = find_group(&*scope, container, ORIGINAL_GROUP).await? else {
            return Ok(Vec::new());
        };
        for unit in &group.units {
            scope.unlink(group.id, *unit).await?;
            tracing::info!(%unit, %container, group = %group.name, "removed content unit");
            trace.append(format!(
                "Removed file {} from {} of container {}",
                unit, group.name, container
            ));
        }
        Ok(group.units)
    }

    async fn unlink_from_container(
        &self,
        scope: &mut dyn StoreScope,
        unit: &ContentUnit,
        container: ContainerId,
        trace: &mut Trace,
    ) -> Result<(), SwordError> {
        let groups = scope.groups_referencing(unit.id).await?;
        for group in groups.into_iter().filter(|g| g.container == container) {
            scope.unlink(group.id, unit.id).await?;
            tracing::info!(unit = %unit.id, %container, group = %group.name, "removed content unit");
            trace.append(format!(
                "Removed file {} from {} of container {}",
                unit.name, group.name, container
            ));
        }
        Ok(())
    }

    /// Destroy those of `units` that no group links any more.
    async fn destroy_orphans(
        &self,
        scope: &mut dyn StoreScope,
        units: &[UnitId],
        trace: &mut Trace,
    ) -> Result<(), SwordError> {
        for unit in units {
            if scope.groups_referencing(*unit).await?.is_empty() {
                scope.destroy_unit(*unit).await?;
                tracing::debug!(%unit, "destroyed unreferenced content unit");
                trace.append(format!("Destroyed unreferenced file {unit}"));
            }
        }
        Ok(())
    }
}
