//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services/`: one unit of work per operation, over the store and replica
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: query/request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses
//! - `extract.rs`: JSON body extractor using those error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<services::AppServices>) -> Router {
    routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn(middleware::request_logging))
            .layer(Extension(services.clone()))
            .layer(axum::middleware::from_fn_with_state(
                services,
                middleware::sync_trigger,
            )),
    )
}
