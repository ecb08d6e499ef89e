use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use object_store_backend::BlobStoreError;

use crate::model::{
    Container, ContainerId, ContentUnit, Group, GroupId, Principal, UnitDraft, UnitId,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("blob storage error: {0}")]
    Blob(#[from] BlobStoreError),
    #[error("no such container: {0}")]
    MissingContainer(ContainerId),
    #[error("no such content unit: {0}")]
    MissingUnit(UnitId),
    #[error("no such group: {0}")]
    MissingGroup(GroupId),
    #[error("group {group} already exists in container {container}")]
    GroupExists { container: ContainerId, group: String },
    #[error("content unit {unit} is not linked into group {group}")]
    NotLinked { group: GroupId, unit: UnitId },
    #[error("content unit {0} is still linked")]
    StillLinked(UnitId),
    #[error("bytes of content unit {0} are missing")]
    MissingBytes(UnitId),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Proof that a scope committed. Consumed by the workflow bridge so that a
/// trigger can only follow a durable commit, and only once.
#[derive(Debug)]
#[must_use = "a committed scope should be followed by workflow resolution"]
pub struct Committed {
    at: DateTime<Utc>,
    mutations: usize,
}

impl Committed {
    pub fn new(mutations: usize) -> Self {
        Self {
            at: Utc::now(),
            mutations,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }

    pub fn mutations(&self) -> usize {
        self.mutations
    }
}

/// Entry point to the content store: hands out one unit of work per request.
#[async_trait]
pub trait ContentStore: Send + Sync + Debug {
    /// Open a scope. `None` opens an anonymous scope.
    async fn open_scope(
        &self,
        principal: Option<Principal>,
    ) -> Result<Box<dyn StoreScope>, StoreError>;

    /// Readiness probe for health checks.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// One request's unit of work. Changes become visible to other scopes only
/// on [`StoreScope::commit`]; [`StoreScope::abort`] discards them.
#[async_trait]
pub trait StoreScope: Send + Sync + Debug {
    fn principal(&self) -> Option<&Principal>;

    async fn container(&self, id: ContainerId) -> Result<Option<Container>, StoreError>;

    async fn unit(&self, id: UnitId) -> Result<Option<ContentUnit>, StoreError>;

    /// Groups of a container in creation order.
    async fn groups(&self, container: ContainerId) -> Result<Vec<Group>, StoreError>;

    /// Every group, in any container, that links `unit`.
    async fn groups_referencing(&self, unit: UnitId) -> Result<Vec<Group>, StoreError>;

    async fn create_group(
        &mut self,
        container: ContainerId,
        name: &str,
    ) -> Result<Group, StoreError>;

    /// Link a unit into a group. Linking twice is a no-op.
    async fn link(&mut self, group: GroupId, unit: UnitId) -> Result<(), StoreError>;

    async fn unlink(&mut self, group: GroupId, unit: UnitId) -> Result<(), StoreError>;

    /// Store bytes as a new, unlinked unit.
    async fn create_unit(&mut self, draft: UnitDraft) -> Result<ContentUnit, StoreError>;

    async fn read_unit(&self, id: UnitId) -> Result<Bytes, StoreError>;

    /// Destroy a unit and its bytes. The unit must not be linked anywhere.
    async fn destroy_unit(&mut self, id: UnitId) -> Result<(), StoreError>;

    /// Set a container's last-modified timestamp.
    async fn touch(&mut self, container: ContainerId, at: DateTime<Utc>)
        -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<Committed, StoreError>;

    async fn abort(self: Box<Self>);
}
