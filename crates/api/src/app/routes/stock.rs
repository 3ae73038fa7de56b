use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use inventaris_core::ProductId;

use crate::app::routes::respond;
use crate::app::extract::JsonBody;
use crate::app::services::stock::StockAdjustment;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(stock_levels))
        .route("/adjust", post(adjust))
        .route("/bulk-adjust", post(bulk_adjust))
        .route("/alerts", get(alerts))
        .route("/:product_id/history", get(history))
}

pub async fn stock_levels(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::ProductListParams>,
) -> axum::response::Response {
    let query = match params.query() {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    match services
        .stock_levels(&query, params.page_request(dto::STOCK_PER_PAGE))
        .await
    {
        Ok(page) => (StatusCode::OK, Json(dto::PageBody::from(page))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn adjust(
    Extension(services): Extension<Arc<AppServices>>,
    actor: ActorContext,
    JsonBody(body): JsonBody<StockAdjustment>,
) -> axum::response::Response {
    match services.adjust_stock(body, actor.into_actor()).await {
        Ok(outcome) => match dto::product_to_json(&outcome.product) {
            Ok(product) => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "product": product,
                    "transaction": outcome.transaction,
                })),
            )
                .into_response(),
            Err(resp) => resp,
        },
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn bulk_adjust(
    Extension(services): Extension<Arc<AppServices>>,
    actor: ActorContext,
    JsonBody(body): JsonBody<dto::BulkAdjustRequest>,
) -> axum::response::Response {
    match services
        .bulk_adjust_stock(body.adjustments, actor.into_actor())
        .await
    {
        Ok(transactions) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "processed": transactions.len(),
                "transactions": transactions,
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn alerts(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    respond(StatusCode::OK, services.stock_alerts().await)
}

pub async fn history(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
    Query(params): Query<dto::PageParams>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_param(&product_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .stock_history(product_id, params.request(dto::HISTORY_PER_PAGE))
        .await
    {
        Ok(history) => match dto::product_to_json(&history.product) {
            Ok(product) => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "product": product,
                    "transactions": dto::PageBody::from(history.transactions),
                })),
            )
                .into_response(),
            Err(resp) => resp,
        },
        Err(e) => errors::service_error_to_response(e),
    }
}
