//! Edit-media routes: one URI per media resource, answering
//! GET (retrieve), PUT (replace), POST (add) and DELETE (remove).
//!
//! The path identifies a container (`/{id}`), its feed (`/{id}.atom`) or a
//! single content unit (`/unit/{id}`). Handlers hand the request path to the
//! media resource manager, which maps it onto a store target.

use axum::http::Uri;
use axum::routing::get;
use axum::Router;

mod add;
mod delete;
mod replace;
pub mod request;
pub mod response;
mod retrieve;

pub use response::{DepositReceipt, MediaError};

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route(
            "/unit/:unit_id",
            get(retrieve::handler)
                .put(replace::handler)
                .post(add::handler)
                .delete(delete::handler),
        )
        .route(
            "/:container_id",
            get(retrieve::handler)
                .put(replace::handler)
                .post(add::handler)
                .delete(delete::handler),
        )
        .with_state(state)
}

/// The request path, relative to the configured base URL.
fn media_path(uri: &Uri) -> &str {
    uri.path().trim_start_matches('/')
}
