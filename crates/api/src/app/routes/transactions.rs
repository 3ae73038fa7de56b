use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use inventaris_core::ProductId;

use crate::app::routes::respond;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/recent", get(recent))
        .route("/product/:product_id", get(for_product))
}

pub async fn recent(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::LimitParams>,
) -> axum::response::Response {
    let limit = params.limit.unwrap_or(dto::RECENT_TRANSACTIONS).clamp(1, 100);
    respond(StatusCode::OK, services.recent_transactions(limit).await)
}

pub async fn for_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
    Query(params): Query<dto::PageParams>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_param(&product_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .product_transactions(product_id, params.request(dto::TRANSACTIONS_PER_PAGE))
        .await
    {
        Ok(page) => (StatusCode::OK, Json(dto::PageBody::from(page))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
