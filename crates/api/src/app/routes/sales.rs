use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use inventaris_core::SalesOrderId;

use crate::app::routes::respond;
use crate::app::extract::JsonBody;
use crate::app::services::sales::{CreateSalesOrder, UpdateSalesOrder};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sales_orders).post(create_sales_order))
        .route(
            "/:id",
            get(get_sales_order)
                .put(update_sales_order)
                .delete(delete_sales_order),
        )
        .route("/:id/confirm", post(confirm_sales_order))
        .route("/:id/ship", post(ship_sales_order))
        .route("/:id/deliver", post(deliver_sales_order))
        .route("/:id/cancel", post(cancel_sales_order))
}

fn order_id(raw: &str) -> Result<SalesOrderId, axum::response::Response> {
    errors::parse_param(raw)
}

pub async fn list_sales_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::OrderListParams>,
) -> axum::response::Response {
    let query = match params.sales_query() {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    match services.list_sales_orders(&query, params.page_request()).await {
        Ok(page) => (StatusCode::OK, Json(dto::PageBody::from(page))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_sales_order(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<CreateSalesOrder>,
) -> axum::response::Response {
    respond(StatusCode::CREATED, services.create_sales_order(body).await)
}

pub async fn get_sales_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.get_sales_order(id).await)
}

pub async fn update_sales_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateSalesOrder>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.update_sales_order(id, body).await)
}

pub async fn delete_sales_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.delete_sales_order(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn confirm_sales_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.confirm_sales_order(id).await)
}

pub async fn ship_sales_order(
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
        services.ship_sales_order(id, actor.into_actor()).await,
    )
}

pub async fn deliver_sales_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.deliver_sales_order(id).await)
}

pub async fn cancel_sales_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.cancel_sales_order(id).await)
}
