use object_store_backend::ObjectStoreConfig;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::access::ContainerPolicy;
use crate::ingest::AcceptPolicy;
use crate::manager::UnitReplaceMode;
use crate::model::ContainerId;
use crate::workflow::WorkflowMode;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base url {url}: {source}")]
    BaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("user {0} has an invalid password digest, expected 64 hex characters")]
    PasswordDigest(String),
    #[error("container {0} is configured more than once")]
    DuplicateContainer(String),
}

/// Retention of packages that failed ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub retain_failed_packages: bool,
    pub store: ObjectStoreConfig,
}

/// A user of the reference authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    pub username: String,
    /// Lowercase hex SHA-256 of the password
    pub password_sha256: String,
}

/// A container seeded into the reference store at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Fixed identifier; generated when absent
    pub id: Option<ContainerId>,
    pub handle: String,
    pub title: Option<String>,
    #[serde(default)]
    pub policy: ContainerPolicy,
}

/// Core settings of the media resource service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwordConfig {
    /// Public base URL edit-media URIs are built under
    pub base_url: String,
    /// Where content unit bytes live
    pub content_store: ObjectStoreConfig,
    pub diagnostics: DiagnosticsConfig,
    pub keep_original_package: bool,
    /// Allow deposits on behalf of another user
    pub allow_mediation: bool,
    pub unit_replace: UnitReplaceMode,
    pub workflow: WorkflowMode,
    pub policy: AcceptPolicy,
    pub users: Vec<UserConfig>,
    pub containers: Vec<ContainerConfig>,
}

impl Default for SwordConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            content_store: ObjectStoreConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            keep_original_package: false,
            allow_mediation: false,
            unit_replace: UnitReplaceMode::default(),
            workflow: WorkflowMode::default(),
            policy: AcceptPolicy::default(),
            users: Vec::new(),
            containers: Vec::new(),
        }
    }
}

impl SwordConfig {
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|source| ConfigError::BaseUrl {
            url: self.base_url.clone(),
            source,
        })
    }

    /// Check everything that can be checked without touching storage.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;

        for user in &self.users {
            let digest = &user.password_sha256;
            if digest.len() != 64 || hex::decode(digest).is_err() {
                return Err(ConfigError::PasswordDigest(user.username.clone()));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for container in &self.containers {
            if !seen.insert(&container.handle) {
                return Err(ConfigError::DuplicateContainer(container.handle.clone()));
            }
        }
        Ok(())
    }
}
