use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use crate::app::services::AppServices;

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "store": services.store().backend(),
        "replica": services.replicator().sink_name(),
        "sync_enabled": services.sync().is_enabled(),
    }))
}
