use axum::extract::{OriginalUri, State};
use axum::http::header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_TYPE, LAST_MODIFIED};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use common::negotiation::NegotiationRequest;
use common::trace::Trace;

use super::request::{header_str, read_credentials, ACCEPT_PACKAGING, CONTENT_MD5, PACKAGING};
use super::response::MediaError;
use super::media_path;
use crate::ServiceState;

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[tracing::instrument(skip(state, headers))]
pub async fn handler(
    State(state): State<ServiceState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Response, MediaError> {
    let mut trace = Trace::new();
    let credentials = read_credentials(&headers);

    let mut request = NegotiationRequest::new();
    if let Some(accept) = header_str(&headers, &ACCEPT) {
        request = request.accept(accept);
    }
    if let Some(packaging) = header_str(&headers, &ACCEPT_PACKAGING) {
        request = request.accept_packaging(packaging);
    }

    let resource = state
        .manager()
        .get_media_resource(media_path(&uri), request, credentials.as_ref(), &mut trace)
        .await
        .map_err(|e| MediaError::traced(e, &trace))?;

    let mut response = (StatusCode::OK, resource.body).into_response();
    let response_headers = response.headers_mut();
    let mut insert = |name: HeaderName, value: String| match HeaderValue::try_from(value) {
        Ok(value) => {
            response_headers.insert(name, value);
        }
        Err(e) => tracing::warn!(header = %name, error = %e, "dropping unrepresentable header"),
    };
    insert(CONTENT_TYPE, resource.content_type);
    insert(CONTENT_MD5, resource.checksum.as_str().to_string());
    insert(
        LAST_MODIFIED,
        resource.last_modified.format(HTTP_DATE).to_string(),
    );
    if let Some(packaging) = resource.packaging {
        insert(PACKAGING, packaging);
    }
    if let Some(filename) = resource.filename {
        insert(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename.replace('"', "")),
        );
    }

    Ok(response)
}
