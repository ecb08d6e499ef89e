//! Reading credentials, negotiation headers and deposit packages off a request.

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use mime::Mime;

use common::error::SwordError;
use common::model::{packaging, Credentials, DepositPackage};

use super::response::MediaError;
use crate::ServiceState;

pub const ON_BEHALF_OF: HeaderName = HeaderName::from_static("on-behalf-of");
pub const PACKAGING: HeaderName = HeaderName::from_static("packaging");
pub const ACCEPT_PACKAGING: HeaderName = HeaderName::from_static("accept-packaging");
pub const CONTENT_MD5: HeaderName = HeaderName::from_static("content-md5");

const ENTRY_PART: &str = "entry";
const PAYLOAD_PART: &str = "payload";

pub fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Basic credentials plus an optional `On-Behalf-Of` user.
pub fn credentials(headers: &HeaderMap) -> Result<Option<Credentials>, SwordError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let malformed = || SwordError::Authentication("malformed Authorization header".into());

    let value = value.to_str().map_err(|_| malformed())?;
    let encoded = value
        .strip_prefix("Basic ")
        .or_else(|| value.strip_prefix("basic "))
        .ok_or_else(malformed)?;
    let decoded = STANDARD.decode(encoded.trim()).map_err(|_| malformed())?;
    let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
    let (username, password) = decoded.split_once(':').ok_or_else(malformed)?;

    let mut credentials = Credentials::new(username, password);
    if let Some(user) = header_str(headers, &ON_BEHALF_OF) {
        credentials = credentials.on_behalf_of(user);
    }
    Ok(Some(credentials))
}

/// Credentials for a read. Anonymous access is decided before credentials
/// matter, so an Authorization header that is not usable Basic credentials
/// is ignored here rather than refused.
pub fn read_credentials(headers: &HeaderMap) -> Option<Credentials> {
    match credentials(headers) {
        Ok(credentials) => credentials,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unusable credentials on read");
            None
        }
    }
}

/// `filename` parameter of a Content-Disposition value.
pub fn disposition_filename(value: &str) -> Option<String> {
    value
        .split(';')
        .skip(1)
        .find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("filename")
                .then(|| value.trim().trim_matches('"').to_string())
        })
        .filter(|name| !name.is_empty())
}

fn is_multipart(mime_type: &Mime) -> bool {
    mime_type.type_() == mime::MULTIPART && mime_type.subtype() == mime::FORM_DATA
}

/// Build a deposit package from the request body and deposit headers.
///
/// A multipart/form-data body carries the content in a `payload` part and
/// may carry a descriptive `entry` part. Any other body is the payload.
pub async fn deposit_package(
    state: &ServiceState,
    request: Request,
) -> Result<DepositPackage, MediaError> {
    let headers = request.headers().clone();
    let content_type: Mime = match header_str(&headers, &CONTENT_TYPE) {
        Some(value) => value
            .parse()
            .map_err(|_| SwordError::BadRequest(format!("invalid Content-Type {value}")))?,
        None => mime::APPLICATION_OCTET_STREAM,
    };
    let packaging = header_str(&headers, &PACKAGING).unwrap_or(packaging::BINARY);
    let mut filename = header_str(&headers, &CONTENT_DISPOSITION).and_then(disposition_filename);

    let mut package = if is_multipart(&content_type) {
        let mut multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| MediaError::body(e.status(), e.body_text()))?;

        let mut entry: Option<Bytes> = None;
        let mut payload: Option<(Bytes, Mime)> = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| MediaError::body(e.status(), e.body_text()))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                ENTRY_PART => {
                    entry = Some(
                        field
                            .bytes()
                            .await
                            .map_err(|e| MediaError::body(e.status(), e.body_text()))?,
                    );
                }
                PAYLOAD_PART => {
                    let mime_type = field
                        .content_type()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(mime::APPLICATION_OCTET_STREAM);
                    if let Some(name) = field.file_name() {
                        filename = Some(name.to_string());
                    }
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| MediaError::body(e.status(), e.body_text()))?;
                    payload = Some((data, mime_type));
                }
                _ => {
                    tracing::warn!("Ignoring unknown multipart field: {}", name);
                }
            }
        }

        let (data, mime_type) = payload.ok_or_else(|| {
            SwordError::BadRequest("multipart deposit without a payload part".into())
        })?;
        let package = DepositPackage::with_packaging(data, mime_type, packaging);
        match entry {
            Some(entry) => package.entry(entry),
            None => package,
        }
    } else {
        let data = Bytes::from_request(request, state)
            .await
            .map_err(|e| MediaError::body(e.status(), e.body_text()))?;
        DepositPackage::with_packaging(data, content_type, packaging)
    };

    if let Some(filename) = filename {
        package = package.filename(filename);
    }
    if let Some(md5) = header_str(&headers, &CONTENT_MD5) {
        package = package.content_md5(md5);
    }
    Ok(package)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_basic_credentials() {
        let mut headers = HeaderMap::new();
        assert!(credentials(&headers).unwrap().is_none());

        // alice:secret
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic YWxpY2U6c2VjcmV0"));
        headers.insert(ON_BEHALF_OF, HeaderValue::from_static("bob"));
        let creds = credentials(&headers).unwrap().unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "secret");
        assert_eq!(creds.on_behalf_of.as_deref(), Some("bob"));
    }

    #[test]
    fn test_malformed_credentials() {
        for value in ["Bearer abc", "Basic !!!", "Basic YWxpY2U="] {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
            assert!(
                matches!(credentials(&headers), Err(SwordError::Authentication(_))),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn test_disposition_filename() {
        assert_eq!(
            disposition_filename("attachment; filename=\"paper.pdf\"").as_deref(),
            Some("paper.pdf")
        );
        assert_eq!(
            disposition_filename("attachment; FileName=data.zip").as_deref(),
            Some("data.zip")
        );
        assert_eq!(disposition_filename("attachment"), None);
        assert_eq!(disposition_filename("attachment; filename=\"\""), None);
    }
}
