use std::fmt::Debug;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use http::request::Parts;

use common::store::ContentStore;

use crate::ServiceState;

/// Something a request depends on that can be probed before serving.
#[async_trait]
pub trait Dependency: Send + Sync {
    fn name(&self) -> &'static str;

    async fn probe(&self) -> Result<(), DependencyError>;
}

#[derive(Debug, thiserror::Error)]
#[error("{name} unavailable: {reason}")]
pub struct DependencyError {
    pub name: &'static str,
    pub reason: String,
}

/// Every dependency of a media request, read out of service state.
pub struct Dependencies(Vec<Arc<dyn Dependency>>);

impl Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|d| d.name()))
            .finish()
    }
}

impl Dependencies {
    pub fn new(dependencies: Vec<Arc<dyn Dependency>>) -> Self {
        Self(dependencies)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Dependency>> {
        self.0.iter()
    }
}

/// The content store holding containers, groups and unit bytes.
struct ContentStoreDependency {
    store: Arc<dyn ContentStore>,
}

#[async_trait]
impl Dependency for ContentStoreDependency {
    fn name(&self) -> &'static str {
        "content_store"
    }

    async fn probe(&self) -> Result<(), DependencyError> {
        self.store.ping().await.map_err(|e| DependencyError {
            name: self.name(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Dependencies
where
    ServiceState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ();

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = ServiceState::from_ref(state);
        Ok(Dependencies::new(vec![Arc::new(ContentStoreDependency {
            store: state.store().clone(),
        })]))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use super::*;

    pub(crate) enum MockDependency {
        Up,
        Down,
        Hanging,
    }

    #[async_trait]
    impl Dependency for MockDependency {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn probe(&self) -> Result<(), DependencyError> {
            match self {
                MockDependency::Up => Ok(()),
                MockDependency::Down => Err(DependencyError {
                    name: "mock",
                    reason: "offline".into(),
                }),
                MockDependency::Hanging => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
            }
        }
    }
}
