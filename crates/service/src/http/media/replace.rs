use axum::extract::{OriginalUri, Request, State};
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use common::trace::Trace;

use super::request::{credentials, deposit_package};
use super::response::{DepositReceipt, MediaError};
use super::media_path;
use crate::ServiceState;

#[tracing::instrument(skip(state, request))]
pub async fn handler(
    State(state): State<ServiceState>,
    OriginalUri(uri): OriginalUri,
    request: Request,
) -> Result<Response, MediaError> {
    let mut trace = Trace::new();
    let credentials = credentials(request.headers()).map_err(|e| MediaError::traced(e, &trace))?;
    let package = deposit_package(&state, request).await?;

    tracing::info!(
        package = %package.id(),
        packaging = package.packaging(),
        size = package.size(),
        "replacing media resource"
    );
    let outcome = state
        .manager()
        .replace_media_resource(media_path(&uri), package, credentials.as_ref(), &mut trace)
        .await
        .map_err(|e| MediaError::traced(e, &trace))?;

    let location = outcome.location.to_string();
    Ok((
        StatusCode::OK,
        [(LOCATION, location)],
        Json(DepositReceipt::new(outcome, &trace)),
    )
        .into_response())
}
