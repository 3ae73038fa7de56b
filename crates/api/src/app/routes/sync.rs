use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Run a full push of the requested tables and wait for it. An empty body
/// syncs every table.
pub async fn sync_firebase(
    Extension(services): Extension<Arc<AppServices>>,
    body: Bytes,
) -> axum::response::Response {
    let request: dto::SyncRequest = if body.iter().all(u8::is_ascii_whitespace) {
        dto::SyncRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.to_string()),
        }
    };

    match services.sync_firebase(&request.table).await {
        Ok(counts) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "synced": counts,
                "records": counts.values().sum::<usize>(),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
