use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    routing::get,
    Router,
};

use crate::app::dto;
use crate::app::routes::respond;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/stats", get(stats))
        .route("/orders", get(order_stats))
        .route("/recent-orders", get(recent_orders))
        .route("/recent-activities", get(recent_activities))
}

pub async fn stats(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    respond(StatusCode::OK, services.dashboard_stats().await)
}

pub async fn order_stats(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    respond(StatusCode::OK, services.order_stats().await)
}

pub async fn recent_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::LimitParams>,
) -> axum::response::Response {
    let limit = params.limit.map(|l| l as usize);
    respond(StatusCode::OK, services.recent_orders(limit).await)
}

pub async fn recent_activities(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    respond(StatusCode::OK, services.recent_activities().await)
}
