use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use inventaris_core::PurchaseOrderId;

use crate::app::routes::respond;
use crate::app::extract::JsonBody;
use crate::app::services::purchases::{CreatePurchaseOrder, UpdatePurchaseOrder};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_purchase_orders).post(create_purchase_order))
        .route(
            "/:id",
            get(get_purchase_order)
                .put(update_purchase_order)
                .delete(delete_purchase_order),
        )
        .route("/:id/approve", post(approve_purchase_order))
        .route("/:id/receive", post(receive_purchase_order))
        .route("/:id/cancel", post(cancel_purchase_order))
}

fn order_id(raw: &str) -> Result<PurchaseOrderId, axum::response::Response> {
    errors::parse_param(raw)
}

pub async fn list_purchase_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::OrderListParams>,
) -> axum::response::Response {
    let query = match params.purchase_query() {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    match services
        .list_purchase_orders(&query, params.page_request())
        .await
    {
        Ok(page) => (StatusCode::OK, Json(dto::PageBody::from(page))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<CreatePurchaseOrder>,
) -> axum::response::Response {
    respond(StatusCode::CREATED, services.create_purchase_order(body).await)
}

pub async fn get_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.get_purchase_order(id).await)
}

pub async fn update_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdatePurchaseOrder>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.update_purchase_order(id, body).await)
}

pub async fn delete_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.delete_purchase_order(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn approve_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.approve_purchase_order(id).await)
}

pub async fn receive_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    actor: ActorContext,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services.receive_purchase_order(id, actor.into_actor()).await,
    )
}

pub async fn cancel_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.cancel_purchase_order(id).await)
}
