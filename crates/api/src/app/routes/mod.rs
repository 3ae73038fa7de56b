use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::app::errors;
use crate::app::services::ServiceResult;

pub mod dashboard;
pub mod products;
pub mod purchases;
pub mod reports;
pub mod sales;
pub mod stock;
pub mod suppliers;
pub mod sync;
pub mod system;
pub mod transactions;

/// Router for every domain endpoint.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .nest("/stock", stock::router())
        .nest("/transactions", transactions::router())
        .nest("/suppliers", suppliers::router())
        .nest("/purchase-orders", purchases::router())
        .nest("/sales-orders", sales::router())
        .nest("/dashboard", dashboard::router())
        .nest("/reports", reports::router())
        .route("/sync/firebase", post(sync::sync_firebase))
        .route("/health", get(system::health))
}

/// Serialize a service result, or map its error to the JSON error body.
pub(crate) fn respond<T: Serialize>(status: StatusCode, result: ServiceResult<T>) -> Response {
    match result {
        Ok(body) => match errors::to_json(&body) {
            Ok(value) => (status, Json(value)).into_response(),
            Err(resp) => resp,
        },
        Err(e) => errors::service_error_to_response(e),
    }
}
