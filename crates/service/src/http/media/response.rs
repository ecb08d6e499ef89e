//! Turning manager results and failures into HTTP responses.

use axum::http::header::{CONTENT_TYPE, WWW_AUTHENTICATE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use common::error::SwordError;
use common::ingest::PolicyViolation;
use common::manager::{DepositOutcome, ReceiptKind};
use common::model::{ContainerId, ContentUnit};
use common::trace::Trace;
use common::workflow::WorkflowStatus;

const REALM: &str = "Basic realm=\"SWORD\"";

/// Body of a successful PUT or POST.
#[derive(Debug, Clone, Serialize)]
pub struct DepositReceipt {
    pub receipt: ReceiptKind,
    pub location: String,
    pub edit_media: String,
    pub container: ContainerId,
    pub units: Vec<ContentUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_package: Option<ContentUnit>,
    pub ingester: String,
    pub workflow: Option<WorkflowStatus>,
    pub recreated: bool,
    pub verbose_description: Vec<String>,
}

impl DepositReceipt {
    pub fn new(outcome: DepositOutcome, trace: &Trace) -> Self {
        Self {
            receipt: outcome.receipt,
            location: outcome.location.to_string(),
            edit_media: outcome.edit_media.to_string(),
            container: outcome.result.container,
            units: outcome.result.units,
            stored_package: outcome.result.stored_package,
            ingester: outcome.result.ingester,
            workflow: outcome.workflow,
            recreated: outcome.recreated,
            verbose_description: trace.lines(),
        }
    }
}

/// A failed media request, with the trace gathered up to the failure.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("{error}")]
    Sword { error: SwordError, trace: Vec<String> },
    /// The body could not be read at all
    #[error("{message}")]
    Body { status: StatusCode, message: String },
}

impl MediaError {
    pub fn traced(error: SwordError, trace: &Trace) -> Self {
        Self::Sword {
            error,
            trace: trace.lines(),
        }
    }

    pub fn body(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Body {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Sword { error, .. } => status_for(error),
            Self::Body { status, .. } => *status,
        }
    }
}

impl From<SwordError> for MediaError {
    fn from(error: SwordError) -> Self {
        Self::Sword {
            error,
            trace: Vec::new(),
        }
    }
}

pub fn status_for(error: &SwordError) -> StatusCode {
    match error {
        SwordError::NotFound(_) => StatusCode::NOT_FOUND,
        SwordError::Authentication(_) => StatusCode::UNAUTHORIZED,
        SwordError::MediationNotAllowed => StatusCode::PRECONDITION_FAILED,
        SwordError::Authorization { .. } => StatusCode::FORBIDDEN,
        SwordError::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
        SwordError::AcceptPolicy(violation) => match violation {
            PolicyViolation::UnsupportedMediaType(_) | PolicyViolation::UnsupportedPackaging(_) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            PolicyViolation::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            PolicyViolation::ChecksumMismatch { .. } => StatusCode::PRECONDITION_FAILED,
            PolicyViolation::MalformedPackage(_) => StatusCode::BAD_REQUEST,
        },
        SwordError::OperationNotSupported(_) => StatusCode::METHOD_NOT_ALLOWED,
        SwordError::BadRequest(_) => StatusCode::BAD_REQUEST,
        SwordError::Ingest(_) | SwordError::Dissemination(_) | SwordError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_kind(error: &SwordError) -> &'static str {
    match error {
        SwordError::NotFound(_) => "not_found",
        SwordError::Authentication(_) => "authentication",
        SwordError::MediationNotAllowed => "mediation_not_allowed",
        SwordError::Authorization { .. } => "authorization",
        SwordError::NotAcceptable(_) => "not_acceptable",
        SwordError::AcceptPolicy(_) => "accept_policy",
        SwordError::Ingest(_) => "ingest",
        SwordError::Dissemination(_) => "dissemination",
        SwordError::OperationNotSupported(_) => "operation_not_supported",
        SwordError::BadRequest(_) => "bad_request",
        SwordError::Store(_) => "store",
    }
}

impl IntoResponse for MediaError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            MediaError::Sword { error, trace } => {
                if error.is_client_error() {
                    tracing::debug!(%status, error = %error, "media request refused");
                } else {
                    tracing::error!(%status, error = %error, "media request failed");
                }

                // server faults keep their detail in the log
                let message = if error.is_client_error() {
                    error.to_string()
                } else {
                    "Unexpected error".to_string()
                };
                let body = Json(serde_json::json!({
                    "error": error_kind(&error),
                    "message": message,
                    "verbose_description": trace,
                }));

                if error.is_retryable_with_credentials() {
                    (status, [(WWW_AUTHENTICATE, REALM)], body).into_response()
                } else {
                    (status, body).into_response()
                }
            }
            MediaError::Body { status, message } => (
                status,
                [(CONTENT_TYPE, "text/plain")],
                format!("Bad request: {}", message),
            )
                .into_response(),
        }
    }
}
