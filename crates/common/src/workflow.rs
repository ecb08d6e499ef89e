use std::collections::HashSet;
use std::fmt::{self, Debug};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SwordError;
use crate::model::{ContainerId, PackageDescriptor};
use crate::store::Committed;
use crate::trace::Trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaOperation {
    Retrieve,
    Replace,
    Add,
    Delete,
}

impl fmt::Display for MediaOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Retrieve => "retrieve",
            Self::Replace => "replace",
            Self::Add => "add",
            Self::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Container,
    Unit,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Container => "container",
            Self::Unit => "content unit",
        })
    }
}

/// Where a container stands after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Published,
    InReview,
    Unchanged,
}

/// A committed mutation, as reported to the workflow engine.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowEvent {
    pub operation: MediaOperation,
    /// The container the request addressed, or the first one referencing
    /// the addressed unit
    pub container: ContainerId,
    pub affected: Vec<ContainerId>,
    pub package: Option<PackageDescriptor>,
    pub principal: Option<String>,
}

/// External publication lifecycle. Its transition rules are its own.
#[async_trait]
pub trait WorkflowEngine: Send + Sync + Debug {
    /// Whether the operation may be attempted at all.
    async fn permits(
        &self,
        _operation: MediaOperation,
        _target: TargetKind,
    ) -> Result<bool, SwordError> {
        Ok(true)
    }

    async fn trigger(&self, event: &WorkflowEvent, trace: &Trace)
        -> Result<WorkflowStatus, SwordError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowMode {
    /// Deposits go live immediately
    #[default]
    Publish,
    /// Deposits wait for review
    Review,
}

/// Workflow engine with a fixed outcome per mutation.
#[derive(Debug, Clone, Default)]
pub struct StaticWorkflow {
    mode: WorkflowMode,
    refused: HashSet<(MediaOperation, TargetKind)>,
}

impl StaticWorkflow {
    pub fn new(mode: WorkflowMode) -> Self {
        Self {
            mode,
            refused: HashSet::new(),
        }
    }

    pub fn refuse(mut self, operation: MediaOperation, target: TargetKind) -> Self {
        self.refused.insert((operation, target));
        self
    }
}

#[async_trait]
impl WorkflowEngine for StaticWorkflow {
    async fn permits(
        &self,
        operation: MediaOperation,
        target: TargetKind,
    ) -> Result<bool, SwordError> {
        Ok(!self.refused.contains(&(operation, target)))
    }

    async fn trigger(
        &self,
        event: &WorkflowEvent,
        _trace: &Trace,
    ) -> Result<WorkflowStatus, SwordError> {
        Ok(match (event.operation, self.mode) {
            (MediaOperation::Delete | MediaOperation::Retrieve, _) => WorkflowStatus::Unchanged,
            (_, WorkflowMode::Publish) => WorkflowStatus::Published,
            (_, WorkflowMode::Review) => WorkflowStatus::InReview,
        })
    }
}

/// Calls into the workflow engine on behalf of the orchestrator.
#[derive(Debug, Clone)]
pub struct WorkflowBridge {
    engine: Arc<dyn WorkflowEngine>,
}

impl WorkflowBridge {
    pub fn new(engine: Arc<dyn WorkflowEngine>) -> Self {
        Self { engine }
    }

    pub async fn check_permitted(
        &self,
        operation: MediaOperation,
        target: TargetKind,
    ) -> Result<(), SwordError> {
        if self.engine.permits(operation, target).await? {
            Ok(())
        } else {
            Err(SwordError::OperationNotSupported(format!(
                "{operation} of a {target} is not allowed by the workflow"
            )))
        }
    }

    /// Trigger the engine for a committed mutation. Taking the commit token
    /// by value ties each trigger to exactly one durable commit.
    pub async fn resolve_state(
        &self,
        committed: Committed,
        event: WorkflowEvent,
        trace: &mut Trace,
    ) -> Result<WorkflowStatus, SwordError> {
        tracing::debug!(
            operation = %event.operation,
            container = %event.container,
            mutations = committed.mutations(),
            "resolving workflow state"
        );
        let status = self.engine.trigger(&event, trace).await?;
        trace.append(format!("Workflow state: {status:?}"));
        Ok(status)
    }
}
