//! HTTP handlers and routers for the service.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse};
use tower_http::LatencyUnit;

pub mod config;
pub mod handlers;
pub mod health;
pub mod media;

pub use config::Config;
pub use handlers::not_found_handler;

use crate::ServiceState;

const STATUS_PREFIX: &str = "/_status";
const MEDIA_PREFIX: &str = "/edit-media";

/// The full application router: edit-media routes plus health checks.
pub fn router(state: ServiceState) -> Router {
    router_with_body_limit(state, config::DEFAULT_BODY_LIMIT)
}

pub fn router_with_body_limit(state: ServiceState, body_limit: usize) -> Router {
    Router::new()
        .nest(STATUS_PREFIX, health::router(state.clone()))
        .nest(MEDIA_PREFIX, media::router(state.clone()))
        .fallback(handlers::not_found_handler)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Run the media resource HTTP server until the shutdown signal fires.
pub async fn run_api(
    config: Config,
    state: ServiceState,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let listen_addr = config.listen_addr;
    let log_level = config.log_level;
    let trace_layer = TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(log_level)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));

    let router = router_with_body_limit(state, config.body_limit).layer(trace_layer);

    tracing::info!(addr = ?listen_addr, "media resource server listening");
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("an error occurred running the HTTP server: {0}")]
    ServingFailed(#[from] std::io::Error),
}
