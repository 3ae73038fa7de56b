use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Router,
};

use inventaris_core::SupplierId;
use inventaris_suppliers::{NewSupplier, SupplierPatch, SupplierStatus};

use crate::app::routes::respond;
use crate::app::extract::JsonBody;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route(
            "/:id",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
        .route("/:id/status", patch(set_status))
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::SupplierListParams>,
) -> axum::response::Response {
    let status = match params.status() {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.list_suppliers(status).await)
}

pub async fn create_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<NewSupplier>,
) -> axum::response::Response {
    respond(StatusCode::CREATED, services.create_supplier(body).await)
}

pub async fn get_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SupplierId = match errors::parse_param(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.get_supplier(id).await)
}

pub async fn update_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<SupplierPatch>,
) -> axum::response::Response {
    let id: SupplierId = match errors::parse_param(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.update_supplier(id, body).await)
}

pub async fn set_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::SupplierStatusRequest>,
) -> axum::response::Response {
    let id: SupplierId = match errors::parse_param(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status: SupplierStatus = match errors::parse_param(&body.status) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.set_supplier_status(id, status).await)
}

pub async fn delete_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SupplierId = match errors::parse_param(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.delete_supplier(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
