use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::SwordError;
use crate::model::{ContainerId, Principal};

/// Per-container permission checks. Decisions about shared units are made
/// by the resolver from these per-container answers.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync + Debug {
    /// `None` asks about anonymous access.
    async fn can_read(
        &self,
        principal: Option<&Principal>,
        container: ContainerId,
    ) -> Result<bool, SwordError>;

    async fn can_write(
        &self,
        principal: &Principal,
        container: ContainerId,
    ) -> Result<bool, SwordError>;
}

/// Read/write policy of one container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerPolicy {
    pub anonymous_read: bool,
    pub readers: BTreeSet<String>,
    pub writers: BTreeSet<String>,
}

impl ContainerPolicy {
    pub fn public() -> Self {
        Self {
            anonymous_read: true,
            ..Self::default()
        }
    }

    pub fn reader(mut self, user: impl Into<String>) -> Self {
        self.readers.insert(user.into());
        self
    }

    pub fn writer(mut self, user: impl Into<String>) -> Self {
        self.writers.insert(user.into());
        self
    }

    fn may_read(&self, user: &str) -> bool {
        self.readers.contains(user) || self.writers.contains(user)
    }
}

/// Policy table held in memory. Containers without a policy deny everything.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuthorization {
    policies: Arc<RwLock<HashMap<ContainerId, ContainerPolicy>>>,
}

impl MemoryAuthorization {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_policy(&self, container: ContainerId, policy: ContainerPolicy) {
        self.policies.write().insert(container, policy);
    }

    pub fn policy(&self, container: ContainerId) -> Option<ContainerPolicy> {
        self.policies.read().get(&container).cloned()
    }
}

#[async_trait]
impl AuthorizationProvider for MemoryAuthorization {
    async fn can_read(
        &self,
        principal: Option<&Principal>,
        container: ContainerId,
    ) -> Result<bool, SwordError> {
        let policies = self.policies.read();
        let Some(policy) = policies.get(&container) else {
            return Ok(false);
        };
        Ok(policy.anonymous_read || principal.is_some_and(|p| policy.may_read(&p.username)))
    }

    /// Both the authenticated user and the user deposited for must be writers.
    async fn can_write(
        &self,
        principal: &Principal,
        container: ContainerId,
    ) -> Result<bool, SwordError> {
        let policies = self.policies.read();
        let Some(policy) = policies.get(&container) else {
            return Ok(false);
        };
        Ok(principal.identities().all(|id| policy.writers.contains(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_policy() {
        let authz = MemoryAuthorization::new();
        let open = ContainerId::generate();
        let closed = ContainerId::generate();
        authz.set_policy(open, ContainerPolicy::public());
        authz.set_policy(closed, ContainerPolicy::default().reader("alice"));

        assert!(authz.can_read(None, open).await.unwrap());
        assert!(!authz.can_read(None, closed).await.unwrap());
        assert!(authz
            .can_read(Some(&Principal::new("alice")), closed)
            .await
            .unwrap());
        assert!(!authz
            .can_read(Some(&Principal::new("bob")), closed)
            .await
            .unwrap());
        assert!(!authz
            .can_read(None, ContainerId::generate())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_write_requires_every_identity() {
        let authz = MemoryAuthorization::new();
        let container = ContainerId::generate();
        authz.set_policy(container, ContainerPolicy::default().writer("alice"));

        let alice = Principal::new("alice");
        assert!(authz.can_write(&alice, container).await.unwrap());
        // writers may read
        assert!(authz.can_read(Some(&alice), container).await.unwrap());

        let mediated = Principal {
            username: "alice".into(),
            on_behalf_of: Some("bob".into()),
        };
        assert!(!authz.can_write(&mediated, container).await.unwrap());

        authz.set_policy(
            container,
            ContainerPolicy::default().writer("alice").writer("bob"),
        );
        assert!(authz.can_write(&mediated, container).await.unwrap());
    }
}
