use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use object_store_backend::ObjectStore;
use parking_lot::RwLock;

use super::provider::{Committed, ContentStore, StoreError, StoreScope};
use crate::model::{
    Checksum, Container, ContainerId, ContentUnit, Group, GroupId, Principal, UnitDraft, UnitId,
};

/// In-memory content store. Metadata lives in index tables; unit bytes are
/// written to an [`ObjectStore`] under `data/<unit id>`.
///
/// A scope works on a private snapshot of the tables and keeps a journal of
/// its mutations, which is replayed against the shared tables on commit.
#[derive(Debug, Clone)]
pub struct MemoryContentStore {
    inner: Arc<RwLock<Tables>>,
    blobs: ObjectStore,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    containers: HashMap<ContainerId, Container>,
    groups: HashMap<GroupId, Group>,
    /// container -> groups, in creation order
    container_groups: HashMap<ContainerId, Vec<GroupId>>,
    units: HashMap<UnitId, ContentUnit>,
    /// unit -> groups linking it, in link order
    unit_groups: HashMap<UnitId, Vec<GroupId>>,
}

#[derive(Debug, Clone)]
enum Mutation {
    CreateGroup(Group),
    Link { group: GroupId, unit: UnitId },
    Unlink { group: GroupId, unit: UnitId },
    CreateUnit(ContentUnit),
    DestroyUnit(UnitId),
    Touch { container: ContainerId, at: DateTime<Utc> },
}

fn blob_key(id: UnitId) -> String {
    format!("data/{id}")
}

impl Tables {
    fn apply(&mut self, mutation: &Mutation) -> Result<(), StoreError> {
        match mutation {
            Mutation::CreateGroup(group) => {
                if !self.containers.contains_key(&group.container) {
                    return Err(StoreError::MissingContainer(group.container));
                }
                let exists = self
                    .groups_of(group.container)
                    .any(|g| g.name == group.name);
                if exists {
                    return Err(StoreError::GroupExists {
                        container: group.container,
                        group: group.name.clone(),
                    });
                }
                self.container_groups
                    .entry(group.container)
                    .or_default()
                    .push(group.id);
                self.groups.insert(group.id, group.clone());
            }
            Mutation::Link { group, unit } => {
                if !self.units.contains_key(unit) {
                    return Err(StoreError::MissingUnit(*unit));
                }
                let target = self
                    .groups
                    .get_mut(group)
                    .ok_or(StoreError::MissingGroup(*group))?;
                if !target.units.contains(unit) {
                    target.units.push(*unit);
                    self.unit_groups.entry(*unit).or_default().push(*group);
                }
            }
            Mutation::Unlink { group, unit } => {
                let target = self
                    .groups
                    .get_mut(group)
                    .ok_or(StoreError::MissingGroup(*group))?;
                let position = target
                    .units
                    .iter()
                    .position(|u| u == unit)
                    .ok_or(StoreError::NotLinked {
                        group: *group,
                        unit: *unit,
                    })?;
                target.units.remove(position);

                if let Some(groups) = self.unit_groups.get_mut(unit) {
                    groups.retain(|g| g != group);
                    if groups.is_empty() {
                        self.unit_groups.remove(unit);
                    }
                }
            }
            Mutation::CreateUnit(unit) => {
                self.units.insert(unit.id, unit.clone());
            }
            Mutation::DestroyUnit(id) => {
                if !self.units.contains_key(id) {
                    return Err(StoreError::MissingUnit(*id));
                }
                if self.unit_groups.get(id).is_some_and(|g| !g.is_empty()) {
                    return Err(StoreError::StillLinked(*id));
                }
                self.units.remove(id);
                self.unit_groups.remove(id);
            }
            Mutation::Touch { container, at } => {
                let target = self
                    .containers
                    .get_mut(container)
                    .ok_or(StoreError::MissingContainer(*container))?;
                target.last_modified = *at;
            }
        }
        Ok(())
    }

    fn groups_of(&self, container: ContainerId) -> impl Iterator<Item = &Group> {
        self.container_groups
            .get(&container)
            .into_iter()
            .flatten()
            .filter_map(|id| self.groups.get(id))
    }
}

impl MemoryContentStore {
    pub fn new(blobs: ObjectStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Tables::default())),
            blobs,
        }
    }

    /// Register a container. Containers are owned by the repository, so
    /// they are seeded here rather than created through a scope.
    pub fn insert_container(&self, container: Container) {
        self.inner
            .write()
            .containers
            .insert(container.id, container);
    }

    pub fn contains_unit(&self, id: UnitId) -> bool {
        self.inner.read().units.contains_key(&id)
    }

    pub fn blobs(&self) -> &ObjectStore {
        &self.blobs
    }
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new(ObjectStore::memory())
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn open_scope(
        &self,
        principal: Option<Principal>,
    ) -> Result<Box<dyn StoreScope>, StoreError> {
        let working = self.inner.read().clone();
        tracing::debug!(
            principal = principal.as_ref().map(|p| p.username.as_str()),
            "opened store scope"
        );
        Ok(Box::new(MemoryScope {
            shared: self.inner.clone(),
            blobs: self.blobs.clone(),
            principal,
            working,
            journal: Vec::new(),
            written: Vec::new(),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.blobs.exists("data/.ping").await?;
        Ok(())
    }
}

/// A unit of work over a [`MemoryContentStore`].
#[derive(Debug)]
pub struct MemoryScope {
    shared: Arc<RwLock<Tables>>,
    blobs: ObjectStore,
    principal: Option<Principal>,
    working: Tables,
    journal: Vec<Mutation>,
    /// Units whose bytes this scope wrote
    written: Vec<UnitId>,
}

impl MemoryScope {
    fn record(&mut self, mutation: Mutation) -> Result<(), StoreError> {
        self.working.apply(&mutation)?;
        self.journal.push(mutation);
        Ok(())
    }

    async fn discard_written(&self) {
        for id in &self.written {
            if let Err(e) = self.blobs.delete(&blob_key(*id)).await {
                tracing::warn!(unit = %id, error = %e, "failed to discard unit bytes");
            }
        }
    }
}

#[async_trait]
impl StoreScope for MemoryScope {
    fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    async fn container(&self, id: ContainerId) -> Result<Option<Container>, StoreError> {
        Ok(self.working.containers.get(&id).cloned())
    }

    async fn unit(&self, id: UnitId) -> Result<Option<ContentUnit>, StoreError> {
        Ok(self.working.units.get(&id).cloned())
    }

    async fn groups(&self, container: ContainerId) -> Result<Vec<Group>, StoreError> {
        if !self.working.containers.contains_key(&container) {
            return Err(StoreError::MissingContainer(container));
        }
        Ok(self.working.groups_of(container).cloned().collect())
    }

    async fn groups_referencing(&self, unit: UnitId) -> Result<Vec<Group>, StoreError> {
        Ok(self
            .working
            .unit_groups
            .get(&unit)
            .into_iter()
            .flatten()
            .filter_map(|id| self.working.groups.get(id))
            .cloned()
            .collect())
    }

    async fn create_group(
        &mut self,
        container: ContainerId,
        name: &str,
    ) -> Result<Group, StoreError> {
        let group = Group {
            id: GroupId::generate(),
            container,
            name: name.to_string(),
            units: Vec::new(),
        };
        self.record(Mutation::CreateGroup(group.clone()))?;
        Ok(group)
    }

    async fn link(&mut self, group: GroupId, unit: UnitId) -> Result<(), StoreError> {
        self.record(Mutation::Link { group, unit })
    }

    async fn unlink(&mut self, group: GroupId, unit: UnitId) -> Result<(), StoreError> {
        self.record(Mutation::Unlink { group, unit })
    }

    async fn create_unit(&mut self, draft: UnitDraft) -> Result<ContentUnit, StoreError> {
        let unit = ContentUnit {
            id: UnitId::generate(),
            name: draft.name,
            mime_type: draft.mime_type.to_string(),
            checksum: Checksum::md5(&draft.data),
            size: draft.data.len() as u64,
            created: Utc::now(),
        };

        self.blobs.put(&blob_key(unit.id), draft.data).await?;
        self.written.push(unit.id);
        self.record(Mutation::CreateUnit(unit.clone()))?;
        Ok(unit)
    }

    async fn read_unit(&self, id: UnitId) -> Result<Bytes, StoreError> {
        if !self.working.units.contains_key(&id) {
            return Err(StoreError::MissingUnit(id));
        }
        self.blobs
            .get(&blob_key(id))
            .await?
            .ok_or(StoreError::MissingBytes(id))
    }

    async fn destroy_unit(&mut self, id: UnitId) -> Result<(), StoreError> {
        self.record(Mutation::DestroyUnit(id))
    }

    async fn touch(
        &mut self,
        container: ContainerId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.record(Mutation::Touch { container, at })
    }

    async fn commit(self: Box<Self>) -> Result<Committed, StoreError> {
        let replayed = {
            let mut shared = self.shared.write();
            let mut next = shared.clone();
            self.journal
                .iter()
                .try_for_each(|m| next.apply(m))
                .map(|()| *shared = next)
        };
        if let Err(e) = replayed {
            self.discard_written().await;
            return Err(e);
        }

        for mutation in &self.journal {
            if let Mutation::DestroyUnit(id) = mutation {
                if let Err(e) = self.blobs.delete(&blob_key(*id)).await {
                    tracing::warn!(unit = %id, error = %e, "failed to delete bytes of destroyed unit");
                }
            }
        }

        tracing::debug!(mutations = self.journal.len(), "committed store scope");
        Ok(Committed::new(self.journal.len()))
    }

    async fn abort(self: Box<Self>) {
        self.discard_written().await;
        tracing::debug!(
            discarded = self.journal.len(),
            "aborted store scope"
        );
    }
}
