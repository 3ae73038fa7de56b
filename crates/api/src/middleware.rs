use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};

use inventaris_infra::replica::SyncTable;

use crate::app::services::AppServices;

/// Log method, path, status and latency of every request.
pub async fn request_logging(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let latency_ms = started.elapsed().as_millis() as u64;
    if status.is_server_error() {
        warn!(%method, %path, status = status.as_u16(), latency_ms, "request failed");
    } else {
        info!(%method, %path, status = status.as_u16(), latency_ms, "request handled");
    }
    response
}

/// Queue replication of whatever a successful mutation touched. The response
/// is returned without waiting for the push.
pub async fn sync_trigger(
    State(services): State<Arc<AppServices>>,
    req: Request,
    next: Next,
) -> Response {
    let tables = tables_for_request(req.method(), req.uri().path());
    let response = next.run(req).await;

    if response.status().is_success() && !tables.is_empty() {
        services.sync().enqueue(tables);
    }
    response
}

/// Tables a mutating request may have changed.
pub fn tables_for_request(method: &Method, path: &str) -> Vec<SyncTable> {
    if !matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    ) {
        return Vec::new();
    }

    let mut segments = path.trim_matches('/').split('/');
    let Some(root) = segments.next() else {
        return Vec::new();
    };
    let action = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();

    match root {
        // Opening stock on create books a movement.
        "products" if *method == Method::POST && segments.next().is_none() => {
            vec![SyncTable::Products, SyncTable::Transactions]
        }
        "products" => vec![SyncTable::Products],
        "suppliers" => vec![SyncTable::Suppliers],
        "stock" => vec![SyncTable::Products, SyncTable::Transactions],
        "purchase-orders" if action == "receive" => vec![
            SyncTable::PurchaseOrders,
            SyncTable::Products,
            SyncTable::Transactions,
        ],
        "purchase-orders" => vec![SyncTable::PurchaseOrders],
        "sales-orders" if action == "ship" => vec![
            SyncTable::SalesOrders,
            SyncTable::Products,
            SyncTable::Transactions,
        ],
        "sales-orders" => vec![SyncTable::SalesOrders],
        _ => Vec::new(),
    }
}
