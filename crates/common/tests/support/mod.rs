//! Shared fixtures for media resource integration tests
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use common::access::{ContainerPolicy, MemoryAuthenticator, MemoryAuthorization};
use common::error::SwordError;
use common::ingest::{
    AcceptPolicy, DiagnosticError, DiagnosticStore, FailedDeposit, Ingester, IngesterRegistry,
    ObjectDiagnosticStore, RetainedPackage,
};
use common::manager::{MediaResourceManager, UnitReplaceMode};
use common::model::{
    packaging, Container, ContainerId, ContentUnit, Credentials, DepositPackage, UnitDraft,
    ORIGINAL_GROUP,
};
use common::store::{
    ensure_group, find_group, ContentStore, MemoryContentStore, StoreError, StoreScope,
};
use common::trace::Trace;
use common::urls::UrlManager;
use common::workflow::{WorkflowEngine, WorkflowEvent, WorkflowStatus};
use object_store_backend::{BlobStoreError, ObjectStore};
use url::Url;

pub const BASE_URL: &str = "http://repo.example/sword/";

/// Counts triggers; optionally fails every one of them.
#[derive(Debug, Default)]
pub struct CountingWorkflow {
    triggers: AtomicUsize,
    fail: bool,
    pub events: parking_lot::Mutex<Vec<WorkflowEvent>>,
}

impl CountingWorkflow {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn triggers(&self) -> usize {
        self.triggers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkflowEngine for CountingWorkflow {
    async fn trigger(
        &self,
        event: &WorkflowEvent,
        _trace: &Trace,
    ) -> Result<WorkflowStatus, SwordError> {
        self.triggers.fetch_add(1, Ordering::SeqCst);
        self.events.lock().push(event.clone());
        if self.fail {
            return Err(SwordError::Store(StoreError::Backend(
                "workflow engine unavailable".into(),
            )));
        }
        Ok(WorkflowStatus::Published)
    }
}

/// A side store that is always down.
#[derive(Debug, Default)]
pub struct BrokenDiagnostics {
    attempts: AtomicUsize,
}

impl BrokenDiagnostics {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiagnosticStore for BrokenDiagnostics {
    async fn retain(
        &self,
        _deposit: &FailedDeposit<'_>,
    ) -> Result<RetainedPackage, DiagnosticError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DiagnosticError::Blob(BlobStoreError::InvalidConfig(
            "side store offline".into(),
        )))
    }
}

pub const BROKEN_PACKAGING: &str = "http://repo.example/packaging/broken";

/// An ingester whose backend always faults after the package was accepted.
#[derive(Debug, Default)]
pub struct FailingIngester;

#[async_trait]
impl Ingester for FailingIngester {
    fn name(&self) -> &'static str {
        "Failing"
    }

    fn packaging(&self) -> &str {
        BROKEN_PACKAGING
    }

    async fn ingest(
        &self,
        _scope: &mut dyn StoreScope,
        _package: &DepositPackage,
        _policy: &AcceptPolicy,
        _trace: &mut Trace,
    ) -> Result<Vec<ContentUnit>, SwordError> {
        Err(SwordError::Ingest("transcoder crashed".into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    Off,
    Working,
    Broken,
}

#[derive(Debug, Clone)]
pub struct EnvOptions {
    pub retention: Retention,
    pub unit_replace: UnitReplaceMode,
    pub keep_original_package: bool,
    pub allow_mediation: bool,
    pub policy: AcceptPolicy,
    pub failing_workflow: bool,
    pub ingesters: Option<IngesterRegistry>,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            retention: Retention::Off,
            unit_replace: UnitReplaceMode::Recreate,
            keep_original_package: false,
            allow_mediation: false,
            policy: AcceptPolicy::default(),
            failing_workflow: false,
            ingesters: None,
        }
    }
}

pub struct TestEnv {
    pub manager: MediaResourceManager,
    pub store: MemoryContentStore,
    pub authz: MemoryAuthorization,
    pub urls: UrlManager,
    pub workflow: Arc<CountingWorkflow>,
    pub diagnostics: Option<ObjectDiagnosticStore>,
    pub broken_diagnostics: Option<Arc<BrokenDiagnostics>>,
}

/// Users: alice/secret, bob/pw, carol/pw. No containers.
pub fn setup_test_env() -> TestEnv {
    setup_with(EnvOptions::default())
}

pub fn setup_with(options: EnvOptions) -> TestEnv {
    let urls = UrlManager::new(Url::parse(BASE_URL).unwrap());
    let store = MemoryContentStore::default();
    let authz = MemoryAuthorization::new();
    let authn = MemoryAuthenticator::new()
        .with_user("alice", "secret")
        .with_user("bob", "pw")
        .with_user("carol", "pw")
        .allow_mediation(options.allow_mediation);
    let workflow = Arc::new(if options.failing_workflow {
        CountingWorkflow::failing()
    } else {
        CountingWorkflow::default()
    });

    let mut builder = MediaResourceManager::builder(Arc::new(store.clone()), urls.clone())
        .authenticator(Arc::new(authn))
        .authorization(Arc::new(authz.clone()))
        .workflow(workflow.clone())
        .policy(options.policy)
        .keep_original_package(options.keep_original_package)
        .unit_replace(options.unit_replace);
    if let Some(ingesters) = options.ingesters {
        builder = builder.ingesters(ingesters);
    }

    let mut diagnostics = None;
    let mut broken_diagnostics = None;
    match options.retention {
        Retention::Off => {}
        Retention::Working => {
            let side = ObjectDiagnosticStore::new(ObjectStore::memory());
            builder = builder.diagnostics(Arc::new(side.clone()));
            diagnostics = Some(side);
        }
        Retention::Broken => {
            let side = Arc::new(BrokenDiagnostics::default());
            builder = builder.diagnostics(side.clone());
            broken_diagnostics = Some(side);
        }
    }

    TestEnv {
        manager: builder.build(),
        store,
        authz,
        urls,
        workflow,
        diagnostics,
        broken_diagnostics,
    }
}

pub fn alice() -> Credentials {
    Credentials::new("alice", "secret")
}

pub fn bob() -> Credentials {
    Credentials::new("bob", "pw")
}

impl TestEnv {
    pub fn container(&self, handle: &str, policy: ContainerPolicy) -> Container {
        let container = Container::new(handle);
        self.store.insert_container(container.clone());
        self.authz.set_policy(container.id, policy);
        container
    }

    /// Store a file and link it into the original group of each container.
    pub async fn seed_file(&self, containers: &[ContainerId], name: &str, data: &[u8]) -> ContentUnit {
        let mut scope = self.store.open_scope(None).await.unwrap();
        let unit = scope
            .create_unit(UnitDraft::new(
                name,
                mime_guess::from_path(name).first_or_octet_stream(),
                Bytes::copy_from_slice(data),
            ))
            .await
            .unwrap();
        for id in containers {
            let group = ensure_group(scope.as_mut(), *id, ORIGINAL_GROUP)
                .await
                .unwrap();
            scope.link(group.id, unit.id).await.unwrap();
        }
        scope.commit().await.unwrap();
        unit
    }

    pub async fn group_units(&self, container: ContainerId, group: &str) -> Vec<ContentUnit> {
        let scope = self.store.open_scope(None).await.unwrap();
        let mut units = Vec::new();
        if let Some(group) = find_group(scope.as_ref(), container, group).await.unwrap() {
            for id in group.units {
                units.push(scope.unit(id).await.unwrap().unwrap());
            }
        }
        scope.abort().await;
        units
    }

    pub async fn original_units(&self, container: ContainerId) -> Vec<ContentUnit> {
        self.group_units(container, ORIGINAL_GROUP).await
    }

    pub async fn last_modified(&self, container: ContainerId) -> chrono::DateTime<chrono::Utc> {
        let scope = self.store.open_scope(None).await.unwrap();
        let found = scope.container(container).await.unwrap().unwrap();
        scope.abort().await;
        found.last_modified
    }

    pub fn edit_media(&self, container: ContainerId) -> String {
        self.urls.edit_media(container).to_string()
    }

    pub fn unit_uri(&self, unit: &ContentUnit) -> String {
        self.urls.unit(unit.id).to_string()
    }
}

pub fn binary(data: &'static [u8], filename: &str) -> DepositPackage {
    DepositPackage::new(
        Bytes::from_static(data),
        mime_guess::from_path(filename).first_or_octet_stream(),
    )
    .filename(filename)
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Bytes {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(name.to_string(), zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    Bytes::from(writer.finish().unwrap().into_inner())
}

pub fn zip_package(entries: &[(&str, &[u8])]) -> DepositPackage {
    DepositPackage::with_packaging(
        zip_bytes(entries),
        "application/zip".parse().unwrap(),
        packaging::SIMPLE_ZIP,
    )
}

pub fn writer_policy(user: &str) -> ContainerPolicy {
    ContainerPolicy::default().writer(user)
}
