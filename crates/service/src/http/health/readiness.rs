use std::collections::BTreeMap;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::time::timeout;

use super::data_source::Dependencies;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Ready when every dependency answers its probe in time.
#[tracing::instrument]
pub async fn handler(dependencies: Dependencies) -> Response {
    let mut report = BTreeMap::new();
    let mut ready = true;

    for dependency in dependencies.iter() {
        let outcome = match timeout(PROBE_TIMEOUT, dependency.probe()).await {
            Ok(Ok(())) => "ok".to_string(),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "readiness probe failed");
                ready = false;
                e.reason
            }
            Err(_) => {
                tracing::warn!(dependency = dependency.name(), "readiness probe timed out");
                ready = false;
                "timed out".to_string()
            }
        };
        report.insert(dependency.name(), outcome);
    }

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = serde_json::json!({ "ready": ready, "dependencies": report });
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::http::health::data_source::tests::MockDependency;

    #[tokio::test]
    async fn test_handler_direct() {
        let response = handler(Dependencies::new(vec![Arc::new(MockDependency::Up)])).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = handler(Dependencies::new(vec![
            Arc::new(MockDependency::Up),
            Arc::new(MockDependency::Down),
        ]))
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout() {
        let response = handler(Dependencies::new(vec![Arc::new(MockDependency::Hanging)])).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
