use crate::ingest::PolicyViolation;
use crate::model::ContainerId;
use crate::store::StoreError;

/// Failures surfaced by the media resource core.
///
/// Client-facing faults (everything but `Store` and `Ingest`) are
/// distinguishable from server faults through [`SwordError::is_client_error`].
#[derive(Debug, thiserror::Error)]
pub enum SwordError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or bad credentials. Retrying with better ones may succeed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("mediated deposit is not allowed")]
    MediationNotAllowed,

    /// Valid credentials without the required permission.
    #[error("not authorized: {reason}")]
    Authorization {
        reason: String,
        container: Option<ContainerId>,
    },

    #[error("not acceptable: {0}")]
    NotAcceptable(String),

    #[error("deposit rejected: {0}")]
    AcceptPolicy(#[from] PolicyViolation),

    #[error("ingest failed: {0}")]
    Ingest(String),

    /// Rendering stored content failed.
    #[error("dissemination failed: {0}")]
    Dissemination(String),

    #[error("operation not supported: {0}")]
    OperationNotSupported(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl SwordError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Store(_) | Self::Ingest(_) | Self::Dissemination(_)
        )
    }

    /// Whether the same request could succeed with different credentials.
    pub fn is_retryable_with_credentials(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// Failures during ingest that trigger retention of the package.
    pub fn is_ingest_rejection(&self) -> bool {
        matches!(self, Self::AcceptPolicy(_) | Self::Ingest(_))
    }
}
