use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::access::{
    lookup, AccessResolver, AccessTarget, Authenticator, AuthorizationProvider,
    MemoryAuthenticator, MemoryAuthorization, ResolvedRead,
};
use crate::disseminate::DisseminatorRegistry;
use crate::error::SwordError;
use crate::ingest::{AcceptPolicy, DiagnosticStore, IngestPipeline, IngesterRegistry};
use crate::model::{Checksum, ContainerId, Credentials, DepositPackage, DepositResult, Principal};
use crate::negotiation::{NegotiationEngine, NegotiationRequest};
use crate::store::{ContentStore, StoreScope};
use crate::trace::Trace;
use crate::urls::{MediaTarget, UrlManager};
use crate::versioning::VersioningCoordinator;
use crate::workflow::{
    MediaOperation, StaticWorkflow, TargetKind, WorkflowBridge, WorkflowEngine, WorkflowEvent,
    WorkflowStatus,
};

/// What to do with a PUT against a single content unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitReplaceMode {
    /// Remove the unit everywhere and recreate it from the new package
    #[default]
    Recreate,
    /// Refuse with "operation not supported"
    Reject,
}

/// Bytes of a media resource plus what a response needs to describe them.
#[derive(Debug, Clone)]
pub struct MediaResource {
    pub body: Bytes,
    pub content_type: String,
    pub packaging: Option<String>,
    pub checksum: Checksum,
    pub last_modified: DateTime<Utc>,
    pub filename: Option<String>,
}

/// Which receipt a deposit answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptKind {
    /// Location of a single stored file
    File,
    /// Location of the replaced media resource
    MediaResource,
    /// Full deposit receipt
    Full,
}

#[derive(Debug, Clone)]
pub struct DepositOutcome {
    pub result: DepositResult,
    pub receipt: ReceiptKind,
    pub location: Url,
    pub edit_media: Url,
    pub workflow: Option<WorkflowStatus>,
    /// A shared unit was removed and recreated rather than replaced
    pub recreated: bool,
}

/// Serves media resource requests: resolves access, then either
/// negotiates and disseminates (reads) or versions and ingests (writes).
///
/// Every request gets one store scope. Reads always abort it. Writes
/// commit it on success, and only then trigger the workflow, once.
#[derive(Debug, Clone)]
pub struct MediaResourceManager {
    store: Arc<dyn ContentStore>,
    access: AccessResolver,
    negotiation: NegotiationEngine,
    versioning: VersioningCoordinator,
    workflow: WorkflowBridge,
    urls: UrlManager,
    unit_replace: UnitReplaceMode,
}

impl MediaResourceManager {
    pub fn builder(store: Arc<dyn ContentStore>, urls: UrlManager) -> ManagerBuilder {
        ManagerBuilder::new(store, urls)
    }

    pub fn urls(&self) -> &UrlManager {
        &self.urls
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub async fn get_media_resource(
        &self,
        uri: &str,
        request: NegotiationRequest<'_>,
        credentials: Option<&Credentials>,
        trace: &mut Trace,
    ) -> Result<MediaResource, SwordError> {
        tracing::info!(uri, "retrieving media resource");
        let target = self.urls.parse(uri)?;

        let ResolvedRead { scope, target: found, .. } = self
            .access
            .resolve_read(self.store.as_ref(), credentials, target, trace)
            .await?;

        let request = NegotiationRequest {
            feed: request.feed || target.is_feed(),
            ..request
        };
        let resource = self.read(scope.as_ref(), &found, &request, trace).await;
        scope.abort().await;
        resource
    }

    async fn read(
        &self,
        scope: &dyn StoreScope,
        target: &AccessTarget,
        request: &NegotiationRequest<'_>,
        trace: &mut Trace,
    ) -> Result<MediaResource, SwordError> {
        match target {
            AccessTarget::Unit { unit, containers } => {
                self.workflow
                    .check_permitted(MediaOperation::Retrieve, TargetKind::Unit)
                    .await?;

                let body = scope.read_unit(unit.id).await?;
                let mut last_modified = None;
                for id in containers {
                    if let Some(container) = scope.container(*id).await? {
                        last_modified = last_modified.max(Some(container.last_modified));
                    }
                }
                trace.append(format!("Retrieved file {}", unit.name));
                Ok(MediaResource {
                    body,
                    content_type: unit.mime_type.clone(),
                    packaging: None,
                    checksum: unit.checksum.clone(),
                    last_modified: last_modified.unwrap_or_else(Utc::now),
                    filename: Some(unit.name.clone()),
                })
            }
            AccessTarget::Container(container) => {
                self.workflow
                    .check_permitted(MediaOperation::Retrieve, TargetKind::Container)
                    .await?;

                let negotiated = self.negotiation.negotiate(request, trace)?;
                let body = negotiated
                    .disseminator
                    .disseminate(scope, container)
                    .await?;
                trace.append(format!(
                    "Disseminated container {} as {}",
                    container.handle, negotiated.content_type
                ));
                Ok(MediaResource {
                    checksum: Checksum::md5(&body),
                    body,
                    content_type: negotiated.content_type,
                    packaging: negotiated.packaging,
                    last_modified: container.last_modified,
                    filename: None,
                })
            }
        }
    }

    pub async fn replace_media_resource(
        &self,
        uri: &str,
        package: DepositPackage,
        credentials: Option<&Credentials>,
        trace: &mut Trace,
    ) -> Result<DepositOutcome, SwordError> {
        tracing::info!(uri, "replacing media resource");
        let target = self.writable_target(uri)?;
        let principal = self.access.authenticate(credentials, trace).await?;
        let mut scope = self.store.open_scope(Some(principal.clone())).await?;

        let replaced = self
            .replace_in_scope(scope.as_mut(), &principal, target, &package, trace)
            .await;
        match replaced {
            Ok((mut outcome, event)) => {
                outcome.workflow = self.commit(scope, event, trace).await?;
                Ok(outcome)
            }
            Err(e) => {
                scope.abort().await;
                Err(e)
            }
        }
    }

    async fn replace_in_scope(
        &self,
        scope: &mut dyn StoreScope,
        principal: &Principal,
        target: MediaTarget,
        package: &DepositPackage,
        trace: &mut Trace,
    ) -> Result<(DepositOutcome, WorkflowEvent), SwordError> {
        match lookup(&*scope, target).await? {
            AccessTarget::Container(container) => {
                self.workflow
                    .check_permitted(MediaOperation::Replace, TargetKind::Container)
                    .await?;
                self.access
                    .require_write(principal, &AccessTarget::Container(container.clone()), trace)
                    .await?;

                let result = self
                    .versioning
                    .replace_container_content(scope, &container, package, trace)
                    .await?;
                let event = self.event(
                    MediaOperation::Replace,
                    container.id,
                    vec![container.id],
                    Some(package),
                    principal,
                );
                let outcome = DepositOutcome {
                    location: self.urls.edit_media(container.id),
                    edit_media: self.urls.edit_media(container.id),
                    receipt: ReceiptKind::MediaResource,
                    result,
                    workflow: None,
                    recreated: false,
                };
                Ok((outcome, event))
            }
            AccessTarget::Unit { unit, .. } => {
                self.workflow
                    .check_permitted(MediaOperation::Replace, TargetKind::Unit)
                    .await?;
                if self.unit_replace == UnitReplaceMode::Reject {
                    return Err(SwordError::OperationNotSupported(
                        "replacing a single file is not supported; replace the container's media resource instead".to_string(),
                    ));
                }

                let replaced = self
                    .versioning
                    .replace_shared_unit(scope, principal, &unit, package, trace)
                    .await?;
                let first = replaced.result.container;
                let location = self.file_location(&replaced.result, first);
                let event = self.event(
                    MediaOperation::Replace,
                    first,
                    replaced.containers,
                    Some(package),
                    principal,
                );
                let outcome = DepositOutcome {
                    location,
                    edit_media: self.urls.edit_media(first),
                    receipt: ReceiptKind::File,
                    result: replaced.result,
                    workflow: None,
                    recreated: true,
                };
                Ok((outcome, event))
            }
        }
    }

    pub async fn add_resource(
        &self,
        uri: &str,
        package: DepositPackage,
        credentials: Option<&Credentials>,
        trace: &mut Trace,
    ) -> Result<DepositOutcome, SwordError> {
        tracing::info!(uri, "adding to media resource");
        let target = self.writable_target(uri)?;
        let principal = self.access.authenticate(credentials, trace).await?;
        let mut scope = self.store.open_scope(Some(principal.clone())).await?;

        let added = self
            .add_in_scope(scope.as_mut(), &principal, target, &package, trace)
            .await;
        match added {
            Ok((mut outcome, event)) => {
                outcome.workflow = self.commit(scope, event, trace).await?;
                Ok(outcome)
            }
            Err(e) => {
                scope.abort().await;
                Err(e)
            }
        }
    }

    async fn add_in_scope(
        &self,
        scope: &mut dyn StoreScope,
        principal: &Principal,
        target: MediaTarget,
        package: &DepositPackage,
        trace: &mut Trace,
    ) -> Result<(DepositOutcome, WorkflowEvent), SwordError> {
        let container = match lookup(&*scope, target).await? {
            AccessTarget::Container(container) => container,
            AccessTarget::Unit { .. } => {
                return Err(SwordError::OperationNotSupported(
                    "files can only be added to a container's media resource".to_string(),
                ))
            }
        };
        self.workflow
            .check_permitted(MediaOperation::Add, TargetKind::Container)
            .await?;
        self.access
            .require_write(principal, &AccessTarget::Container(container.clone()), trace)
            .await?;

        let result = self
            .versioning
            .add_content(scope, &container, package, trace)
            .await?;

        let edit_media = self.urls.edit_media(container.id);
        let (receipt, location) = if package.is_binary() {
            (ReceiptKind::File, self.file_location(&result, container.id))
        } else {
            (ReceiptKind::Full, edit_media.clone())
        };
        let event = self.event(
            MediaOperation::Add,
            container.id,
            vec![container.id],
            Some(package),
            principal,
        );
        let outcome = DepositOutcome {
            result,
            receipt,
            location,
            edit_media,
            workflow: None,
            recreated: false,
        };
        Ok((outcome, event))
    }

    pub async fn delete_media_resource(
        &self,
        uri: &str,
        credentials: Option<&Credentials>,
        trace: &mut Trace,
    ) -> Result<Option<WorkflowStatus>, SwordError> {
        tracing::info!(uri, "deleting media resource");
        let target = self.writable_target(uri)?;
        let principal = self.access.authenticate(credentials, trace).await?;
        let mut scope = self.store.open_scope(Some(principal.clone())).await?;

        let deleted = self
            .delete_in_scope(scope.as_mut(), &principal, target, trace)
            .await;
        match deleted {
            Ok(event) => self.commit(scope, event, trace).await,
            Err(e) => {
                scope.abort().await;
                Err(e)
            }
        }
    }

    async fn delete_in_scope(
        &self,
        scope: &mut dyn StoreScope,
        principal: &Principal,
        target: MediaTarget,
        trace: &mut Trace,
    ) -> Result<WorkflowEvent, SwordError> {
        match lookup(&*scope, target).await? {
            AccessTarget::Container(container) => {
                self.workflow
                    .check_permitted(MediaOperation::Delete, TargetKind::Container)
                    .await?;
                self.access
                    .require_write(principal, &AccessTarget::Container(container.clone()), trace)
                    .await?;
                self.versioning
                    .remove_container_content(scope, &container, trace)
                    .await?;
                Ok(self.event(
                    MediaOperation::Delete,
                    container.id,
                    vec![container.id],
                    None,
                    principal,
                ))
            }
            AccessTarget::Unit { unit, .. } => {
                self.workflow
                    .check_permitted(MediaOperation::Delete, TargetKind::Unit)
                    .await?;
                let containers = self
                    .versioning
                    .remove_shared_unit(scope, principal, &unit, trace)
                    .await?;
                let first = containers
                    .first()
                    .copied()
                    .ok_or_else(|| SwordError::not_found(format!("content unit {}", unit.id)))?;
                Ok(self.event(MediaOperation::Delete, first, containers, None, principal))
            }
        }
    }

    /// Feeds are read-only; anything else that parses may be written.
    fn writable_target(&self, uri: &str) -> Result<MediaTarget, SwordError> {
        let target = self.urls.parse(uri)?;
        if target.is_feed() {
            return Err(SwordError::OperationNotSupported(
                "the feed representation cannot be modified".to_string(),
            ));
        }
        Ok(target)
    }

    /// Commit, then resolve workflow. A workflow failure after a durable
    /// commit is logged and reported as "no status", not as a failure.
    async fn commit(
        &self,
        scope: Box<dyn StoreScope>,
        event: WorkflowEvent,
        trace: &mut Trace,
    ) -> Result<Option<WorkflowStatus>, SwordError> {
        trace.append(format!(
            "Total time for deposit processing: {} ms",
            trace.elapsed().as_millis()
        ));
        let committed = scope.commit().await?;

        match self.workflow.resolve_state(committed, event, trace).await {
            Ok(status) => Ok(Some(status)),
            Err(e) => {
                tracing::error!(error = %e, "workflow trigger failed after commit");
                trace.append(format!("Workflow could not be resolved: {e}"));
                Ok(None)
            }
        }
    }

    fn event(
        &self,
        operation: MediaOperation,
        container: ContainerId,
        affected: Vec<ContainerId>,
        package: Option<&DepositPackage>,
        principal: &Principal,
    ) -> WorkflowEvent {
        WorkflowEvent {
            operation,
            container,
            affected,
            package: package.map(DepositPackage::descriptor),
            principal: Some(principal.to_string()),
        }
    }

    fn file_location(&self, result: &DepositResult, container: ContainerId) -> Url {
        match result.original_deposit() {
            Some(unit) => self.urls.unit(unit.id),
            None => self.urls.edit_media(container),
        }
    }
}

/// Assembles a [`MediaResourceManager`]. Collaborators that are not set
/// fall back to the in-memory reference implementations, which deny
/// everything until configured.
pub struct ManagerBuilder {
    store: Arc<dyn ContentStore>,
    urls: UrlManager,
    authenticator: Option<Arc<dyn Authenticator>>,
    authorization: Option<Arc<dyn AuthorizationProvider>>,
    workflow: Option<Arc<dyn WorkflowEngine>>,
    disseminators: Option<DisseminatorRegistry>,
    ingesters: Option<IngesterRegistry>,
    policy: AcceptPolicy,
    diagnostics: Option<Arc<dyn DiagnosticStore>>,
    keep_original_package: bool,
    unit_replace: UnitReplaceMode,
}

impl ManagerBuilder {
    fn new(store: Arc<dyn ContentStore>, urls: UrlManager) -> Self {
        Self {
            store,
            urls,
            authenticator: None,
            authorization: None,
            workflow: None,
            disseminators: None,
            ingesters: None,
            policy: AcceptPolicy::default(),
            diagnostics: None,
            keep_original_package: false,
            unit_replace: UnitReplaceMode::default(),
        }
    }

    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn authorization(mut self, authorization: Arc<dyn AuthorizationProvider>) -> Self {
        self.authorization = Some(authorization);
        self
    }

    pub fn workflow(mut self, workflow: Arc<dyn WorkflowEngine>) -> Self {
        self.workflow = Some(workflow);
        self
    }

    pub fn disseminators(mut self, registry: DisseminatorRegistry) -> Self {
        self.disseminators = Some(registry);
        self
    }

    pub fn ingesters(mut self, registry: IngesterRegistry) -> Self {
        self.ingesters = Some(registry);
        self
    }

    pub fn policy(mut self, policy: AcceptPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Retain rejected packages in this side store.
    pub fn diagnostics(mut self, diagnostics: Arc<dyn DiagnosticStore>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn keep_original_package(mut self, keep: bool) -> Self {
        self.keep_original_package = keep;
        self
    }

    pub fn unit_replace(mut self, mode: UnitReplaceMode) -> Self {
        self.unit_replace = mode;
        self
    }

    pub fn build(self) -> MediaResourceManager {
        let access = AccessResolver::new(
            self.authenticator
                .unwrap_or_else(|| Arc::new(MemoryAuthenticator::new())),
            self.authorization
                .unwrap_or_else(|| Arc::new(MemoryAuthorization::new())),
        );
        let disseminators = self
            .disseminators
            .unwrap_or_else(|| DisseminatorRegistry::with_defaults(self.urls.clone()));
        let ingesters = self.ingesters.unwrap_or_else(IngesterRegistry::with_defaults);

        let mut pipeline = IngestPipeline::new(Arc::new(ingesters), self.policy)
            .keep_original_package(self.keep_original_package);
        if let Some(diagnostics) = self.diagnostics {
            pipeline = pipeline.with_diagnostics(diagnostics);
        }

        MediaResourceManager {
            store: self.store,
            negotiation: NegotiationEngine::new(Arc::new(disseminators)),
            versioning: VersioningCoordinator::new(access.clone(), pipeline),
            access,
            workflow: WorkflowBridge::new(
                self.workflow
                    .unwrap_or_else(|| Arc::new(StaticWorkflow::default())),
            ),
            urls: self.urls,
            unit_replace: self.unit_replace,
        }
    }
}
