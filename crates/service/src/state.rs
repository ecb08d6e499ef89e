use std::sync::Arc;

use common::access::{MemoryAuthenticator, MemoryAuthorization};
use common::config::SwordConfig;
use common::ingest::ObjectDiagnosticStore;
use common::manager::MediaResourceManager;
use common::model::Container;
use common::store::{ContentStore, MemoryContentStore};
use common::urls::UrlManager;
use common::workflow::StaticWorkflow;
use object_store_backend::{BlobStoreError, ObjectStore};

use super::config::Config;

/// Main service state - shared by every request handler
#[derive(Debug, Clone)]
pub struct State {
    manager: MediaResourceManager,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        Self::from_sword_config(&config.sword).await
    }

    pub async fn from_sword_config(sword: &SwordConfig) -> Result<Self, StateSetupError> {
        sword.validate()?;
        let urls = UrlManager::new(sword.base_url()?);
        tracing::info!("Base URL: {}", urls.base());

        // 1. Setup content store
        tracing::debug!(config = ?sword.content_store, "State::from_config - loading content store");
        let blobs = ObjectStore::new(sword.content_store.clone()).await?;
        let store = MemoryContentStore::new(blobs);

        // 2. Seed containers and their policies
        let authorization = MemoryAuthorization::new();
        for seed in &sword.containers {
            let mut container = Container::new(&seed.handle);
            if let Some(id) = seed.id {
                container = container.with_id(id);
            }
            if let Some(title) = &seed.title {
                container = container.with_title(title);
            }
            authorization.set_policy(container.id, seed.policy.clone());
            tracing::info!(id = %container.id, handle = %container.handle, "seeded container");
            store.insert_container(container);
        }

        // 3. Users
        let mut authenticator =
            MemoryAuthenticator::new().allow_mediation(sword.allow_mediation);
        for user in &sword.users {
            authenticator =
                authenticator.with_password_digest(&user.username, &user.password_sha256);
        }

        let mut builder = MediaResourceManager::builder(Arc::new(store), urls)
            .authenticator(Arc::new(authenticator))
            .authorization(Arc::new(authorization))
            .workflow(Arc::new(StaticWorkflow::new(sword.workflow)))
            .policy(sword.policy.clone())
            .keep_original_package(sword.keep_original_package)
            .unit_replace(sword.unit_replace);

        // 4. Side store for failed deposits
        if sword.diagnostics.retain_failed_packages {
            tracing::debug!(config = ?sword.diagnostics.store, "State::from_config - loading diagnostics store");
            let side = ObjectStore::new(sword.diagnostics.store.clone()).await?;
            builder = builder.diagnostics(Arc::new(ObjectDiagnosticStore::new(side)));
        }

        Ok(Self {
            manager: builder.build(),
        })
    }

    pub fn manager(&self) -> &MediaResourceManager {
        &self.manager
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        self.manager.store()
    }

    pub fn urls(&self) -> &UrlManager {
        self.manager.urls()
    }
}

impl AsRef<MediaResourceManager> for State {
    fn as_ref(&self) -> &MediaResourceManager {
        &self.manager
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] common::config::ConfigError),
    #[error("object store error: {0}")]
    ObjectStore(#[from] BlobStoreError),
}

#[cfg(test)]
mod tests {
    use common::access::{password_digest, ContainerPolicy};
    use common::config::{ContainerConfig, DiagnosticsConfig, UserConfig};
    use common::model::ContainerId;
    use object_store_backend::ObjectStoreConfig;

    use super::*;

    #[tokio::test]
    async fn test_from_config_seeds_containers() {
        let id = ContainerId::generate();
        let temp_dir = tempfile::tempdir().unwrap();
        let sword = SwordConfig {
            diagnostics: DiagnosticsConfig {
                retain_failed_packages: true,
                store: ObjectStoreConfig::Local {
                    path: temp_dir.path().to_path_buf(),
                },
            },
            users: vec![UserConfig {
                username: "alice".into(),
                password_sha256: password_digest("secret"),
            }],
            containers: vec![ContainerConfig {
                id: Some(id),
                handle: "123456789/1".into(),
                title: Some("Theses".into()),
                policy: ContainerPolicy::public(),
            }],
            ..SwordConfig::default()
        };

        let state = State::from_sword_config(&sword).await.unwrap();
        let scope = state.store().open_scope(None).await.unwrap();
        let container = scope.container(id).await.unwrap().unwrap();
        scope.abort().await;

        assert_eq!(container.handle, "123456789/1");
        assert_eq!(container.title.as_deref(), Some("Theses"));
        state.store().ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_from_config_rejects_bad_digest() {
        let sword = SwordConfig {
            users: vec![UserConfig {
                username: "alice".into(),
                password_sha256: "secret".into(),
            }],
            ..SwordConfig::default()
        };
        assert!(matches!(
            State::from_sword_config(&sword).await,
            Err(StateSetupError::Config(_))
        ));
    }
}
