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
        .route("/stock", get(stock))
        .route("/sales", get(sales))
        .route("/trends", get(trends))
        .route("/product-performance", get(product_performance))
        .route("/inventory-efficiency", get(inventory_efficiency))
}

pub async fn stock(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    respond(StatusCode::OK, services.stock_report().await)
}

pub async fn sales(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::SalesReportParams>,
) -> axum::response::Response {
    respond(
        StatusCode::OK,
        services.sales_report(params.date_from, params.date_to).await,
    )
}

pub async fn trends(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::TrendParams>,
) -> axum::response::Response {
    let (granularity, metrics) = match (params.granularity(), params.metrics()) {
        (Ok(granularity), Ok(metrics)) => (granularity, metrics),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    respond(
        StatusCode::OK,
        services
            .trend_analysis(granularity, params.date_from, params.date_to, metrics)
            .await,
    )
}

pub async fn product_performance(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::PerformanceParams>,
) -> axum::response::Response {
    let sort = match params.sort() {
        Ok(sort) => sort,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services
            .product_performance(
                params.date_from,
                params.date_to,
                params.category(),
                sort,
                params.limit,
            )
            .await,
    )
}

pub async fn inventory_efficiency(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    respond(StatusCode::OK, services.inventory_efficiency().await)
}
