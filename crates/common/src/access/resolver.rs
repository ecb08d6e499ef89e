use std::fmt;
use std::sync::Arc;

use crate::error::SwordError;
use crate::model::{Container, ContainerId, ContentUnit, Credentials, Principal};
use crate::store::{containers_referencing, ContentStore, StoreScope};
use crate::trace::Trace;
use crate::urls::MediaTarget;

use super::{Authenticator, AuthorizationProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    AnonymousRead,
    AuthenticatedRead,
    NoReadPermission,
    WritePermitted,
    NoWritePermission,
    /// The unit is not linked into any container
    Unreferenced,
}

impl fmt::Display for AccessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AnonymousRead => "anonymous read permitted",
            Self::AuthenticatedRead => "read permitted",
            Self::NoReadPermission => "no read permission",
            Self::WritePermitted => "write permitted",
            Self::NoWritePermission => "no write permission",
            Self::Unreferenced => "content unit is not part of any container",
        })
    }
}

/// Outcome of an access check, with the containers that were evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub outcome: AccessOutcome,
    pub reason: AccessReason,
    pub principal: Option<String>,
    /// Containers whose policy the decision rests on
    pub evaluated: Vec<ContainerId>,
    /// First container that refused, for denials
    pub denied_by: Option<ContainerId>,
}

impl AccessDecision {
    fn granted(reason: AccessReason, principal: Option<&Principal>, evaluated: Vec<ContainerId>) -> Self {
        Self {
            outcome: AccessOutcome::Granted,
            reason,
            principal: principal.map(|p| p.to_string()),
            evaluated,
            denied_by: None,
        }
    }

    fn denied(
        reason: AccessReason,
        principal: Option<&Principal>,
        evaluated: Vec<ContainerId>,
        denied_by: Option<ContainerId>,
    ) -> Self {
        Self {
            outcome: AccessOutcome::Denied,
            reason,
            principal: principal.map(|p| p.to_string()),
            evaluated,
            denied_by,
        }
    }

    pub fn is_granted(&self) -> bool {
        self.outcome == AccessOutcome::Granted
    }

    fn into_error(self) -> SwordError {
        let reason = match (&self.principal, self.denied_by) {
            (Some(who), Some(container)) => {
                format!("{} for {} on container {}", self.reason, who, container)
            }
            (Some(who), None) => format!("{} for {}", self.reason, who),
            (None, _) => self.reason.to_string(),
        };
        SwordError::Authorization {
            reason,
            container: self.denied_by,
        }
    }
}

/// A looked-up target together with the containers its access rests on.
#[derive(Debug, Clone)]
pub enum AccessTarget {
    Container(Container),
    Unit {
        unit: ContentUnit,
        /// Every container referencing the unit, in link order
        containers: Vec<ContainerId>,
    },
}

impl AccessTarget {
    pub fn containers(&self) -> Vec<ContainerId> {
        match self {
            Self::Container(c) => vec![c.id],
            Self::Unit { containers, .. } => containers.clone(),
        }
    }
}

/// States of read resolution, in the order they were passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessState {
    Unauthenticated,
    Authenticating,
    Resolved(AccessOutcome),
}

/// A granted read: the scope it was granted in stays open for the caller.
#[derive(Debug)]
pub struct ResolvedRead {
    pub scope: Box<dyn StoreScope>,
    pub target: AccessTarget,
    pub decision: AccessDecision,
    pub principal: Option<Principal>,
    pub transitions: Vec<AccessState>,
}

/// A granted write over every container the target rests on.
#[derive(Debug, Clone)]
pub struct WriteGrant {
    pub decision: AccessDecision,
    pub containers: Vec<ContainerId>,
}

/// Read resolution moves the scope along with the state, so the anonymous
/// scope is gone before an authenticated one is opened.
enum ReadPhase {
    Unauthenticated(Box<dyn StoreScope>),
    Authenticating,
    Resolved {
        scope: Box<dyn StoreScope>,
        target: AccessTarget,
        decision: AccessDecision,
        principal: Option<Principal>,
    },
}

#[derive(Debug, Clone)]
pub struct AccessResolver {
    authenticator: Arc<dyn Authenticator>,
    authorization: Arc<dyn AuthorizationProvider>,
}

impl AccessResolver {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        authorization: Arc<dyn AuthorizationProvider>,
    ) -> Self {
        Self {
            authenticator,
            authorization,
        }
    }

    /// Validate credentials. Absent credentials are an authentication error.
    pub async fn authenticate(
        &self,
        credentials: Option<&Credentials>,
        trace: &mut Trace,
    ) -> Result<Principal, SwordError> {
        let credentials = credentials
            .ok_or_else(|| SwordError::Authentication("credentials required".to_string()))?;
        let principal = self.authenticator.authenticate(credentials).await?;

        trace.append(format!("Authenticated user: {}", principal.username));
        if let Some(obo) = &principal.on_behalf_of {
            trace.append(format!("Depositing on behalf of: {obo}"));
        }
        Ok(principal)
    }

    /// Resolve a read of `target`, anonymously first.
    ///
    /// An absent target is reported before credentials are looked at.
    /// Credentials are only demanded once the anonymous check has been
    /// denied, and then the anonymous scope is aborted before the
    /// authenticated one is opened. There is no second attempt.
    pub async fn resolve_read(
        &self,
        store: &dyn ContentStore,
        credentials: Option<&Credentials>,
        target: MediaTarget,
        trace: &mut Trace,
    ) -> Result<ResolvedRead, SwordError> {
        let mut transitions = Vec::new();
        let mut phase = ReadPhase::Unauthenticated(store.open_scope(None).await?);

        loop {
            phase = match phase {
                ReadPhase::Unauthenticated(scope) => {
                    transitions.push(AccessState::Unauthenticated);
                    let (scope, found) = lookup_or_abort(scope, target).await?;

                    let decision = self.check_read(None, &found).await;
                    let decision = match decision {
                        Ok(decision) => decision,
                        Err(e) => {
                            scope.abort().await;
                            return Err(e);
                        }
                    };

                    if decision.is_granted() {
                        tracing::debug!(?target, "anonymous read granted");
                        ReadPhase::Resolved {
                            scope,
                            target: found,
                            decision,
                            principal: None,
                        }
                    } else {
                        trace.append("Anonymous access denied; authenticating");
                        scope.abort().await;
                        ReadPhase::Authenticating
                    }
                }
                ReadPhase::Authenticating => {
                    transitions.push(AccessState::Authenticating);
                    let principal = self.authenticate(credentials, trace).await?;
                    let scope = store.open_scope(Some(principal.clone())).await?;
                    let (scope, found) = lookup_or_abort(scope, target).await?;

                    let decision = match self.check_read(Some(&principal), &found).await {
                        Ok(decision) => decision,
                        Err(e) => {
                            scope.abort().await;
                            return Err(e);
                        }
                    };
                    if !decision.is_granted() {
                        tracing::debug!(?target, user = %principal, "read denied");
                        scope.abort().await;
                        return Err(decision.into_error());
                    }
                    ReadPhase::Resolved {
                        scope,
                        target: found,
                        decision,
                        principal: Some(principal),
                    }
                }
                ReadPhase::Resolved {
                    scope,
                    target,
                    decision,
                    principal,
                } => {
                    transitions.push(AccessState::Resolved(decision.outcome));
                    return Ok(ResolvedRead {
                        scope,
                        target,
                        decision,
                        principal,
                        transitions,
                    });
                }
            };
        }
    }

    /// Read decision for an already looked-up target. A unit is readable
    /// when any container referencing it is.
    pub async fn check_read(
        &self,
        principal: Option<&Principal>,
        target: &AccessTarget,
    ) -> Result<AccessDecision, SwordError> {
        let granted_reason = if principal.is_some() {
            AccessReason::AuthenticatedRead
        } else {
            AccessReason::AnonymousRead
        };

        let containers = target.containers();
        if containers.is_empty() {
            return Ok(AccessDecision::denied(
                AccessReason::Unreferenced,
                principal,
                containers,
                None,
            ));
        }
        for container in &containers {
            if self.authorization.can_read(principal, *container).await? {
                return Ok(AccessDecision::granted(
                    granted_reason,
                    principal,
                    vec![*container],
                ));
            }
        }
        Ok(AccessDecision::denied(
            AccessReason::NoReadPermission,
            principal,
            containers,
            None,
        ))
    }

    /// Write decision. For a shared unit every referencing container is
    /// enumerated first, then checked in order; the first refusal decides.
    pub async fn check_write(
        &self,
        principal: &Principal,
        target: &AccessTarget,
    ) -> Result<AccessDecision, SwordError> {
        let containers = target.containers();
        if containers.is_empty() {
            return Ok(AccessDecision::denied(
                AccessReason::Unreferenced,
                Some(principal),
                containers,
                None,
            ));
        }
        for container in &containers {
            if !self.authorization.can_write(principal, *container).await? {
                let denied_by = Some(*container);
                return Ok(AccessDecision::denied(
                    AccessReason::NoWritePermission,
                    Some(principal),
                    containers,
                    denied_by,
                ));
            }
        }
        Ok(AccessDecision::granted(
            AccessReason::WritePermitted,
            Some(principal),
            containers,
        ))
    }

    /// [`AccessResolver::check_write`], with a denial turned into an error.
    pub async fn require_write(
        &self,
        principal: &Principal,
        target: &AccessTarget,
        trace: &mut Trace,
    ) -> Result<WriteGrant, SwordError> {
        let decision = self.check_write(principal, target).await?;
        if !decision.is_granted() {
            trace.append(format!(
                "Write denied for {} ({} container(s) checked)",
                principal,
                decision.evaluated.len()
            ));
            return Err(decision.into_error());
        }
        Ok(WriteGrant {
            containers: decision.evaluated.clone(),
            decision,
        })
    }
}

/// Look a target up in a scope.
pub async fn lookup(scope: &dyn StoreScope, target: MediaTarget) -> Result<AccessTarget, SwordError> {
    match target {
        MediaTarget::Container { id, .. } => scope
            .container(id)
            .await?
            .map(AccessTarget::Container)
            .ok_or_else(|| SwordError::not_found(format!("container {id}"))),
        MediaTarget::Unit(id) => {
            let unit = scope
                .unit(id)
                .await?
                .ok_or_else(|| SwordError::not_found(format!("content unit {id}")))?;
            let containers = containers_referencing(scope, id).await?;
            Ok(AccessTarget::Unit { unit, containers })
        }
    }
}

async fn lookup_or_abort(
    scope: Box<dyn StoreScope>,
    target: MediaTarget,
) -> Result<(Box<dyn StoreScope>, AccessTarget), SwordError> {
    match lookup(scope.as_ref(), target).await {
        Ok(found) => Ok((scope, found)),
        Err(e) => {
            scope.abort().await;
            Err(e)
        }
    }
}
