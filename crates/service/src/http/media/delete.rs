use axum::extract::{OriginalUri, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use common::trace::Trace;

use super::request::credentials;
use super::response::MediaError;
use super::media_path;
use crate::ServiceState;

#[tracing::instrument(skip(state, headers))]
pub async fn handler(
    State(state): State<ServiceState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Response, MediaError> {
    let mut trace = Trace::new();
    let credentials = credentials(&headers).map_err(|e| MediaError::traced(e, &trace))?;

    let status = state
        .manager()
        .delete_media_resource(media_path(&uri), credentials.as_ref(), &mut trace)
        .await
        .map_err(|e| MediaError::traced(e, &trace))?;
    tracing::debug!(?status, "media resource deleted");

    Ok(StatusCode::NO_CONTENT.into_response())
}
