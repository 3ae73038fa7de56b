use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::{Value, json};

use inventaris_core::DomainError;
use inventaris_infra::replica::ReplicaError;
use inventaris_infra::store::StoreError;

use crate::app::services::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
        }
        ServiceError::Store(StoreError::NotFound(msg)) => {
            json_error(StatusCode::NOT_FOUND, "not_found", msg)
        }
        ServiceError::Store(StoreError::Conflict(msg)) => {
            json_error(StatusCode::CONFLICT, "conflict", msg)
        }
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        ServiceError::Replica(ReplicaError::Store(e)) => {
            service_error_to_response(ServiceError::Store(e))
        }
        ServiceError::Replica(e) => json_error(StatusCode::BAD_GATEWAY, "sync_failed", e.to_string()),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg)
        }
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::InsufficientStock {
            product_id,
            product_name,
            available,
            requested,
        } => {
            let message = format!(
                "insufficient stock for {product_name}: available {available}, requested {requested}"
            );
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                axum::Json(json!({
                    "error": "insufficient_stock",
                    "message": message,
                    "product_id": product_id.to_string(),
                    "available": available,
                    "requested": requested,
                })),
            )
                .into_response()
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Serialize a response body. A failure is logged and answered with 500.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value, axum::response::Response> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize response body");
        json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "serialization_error",
            e.to_string(),
        )
    })
}

/// Parse a path or query value, answering with the domain error's status.
pub fn parse_param<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr<Err = DomainError>,
{
    raw.trim().parse().map_err(domain_error_to_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventaris_core::ProductId;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (ServiceError::NotFound("product"), StatusCode::NOT_FOUND),
            (DomainError::validation("x").into(), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::invariant("x").into(), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::invalid_id("x").into(), StatusCode::BAD_REQUEST),
            (DomainError::conflict("x").into(), StatusCode::CONFLICT),
            (
                DomainError::insufficient_stock(ProductId::new(), "Mug", 1, 2).into(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (StoreError::Database("down".into()).into(), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ReplicaError::Transport("offline".into()).into(),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(service_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn unserializable_body_is_internal_error() {
        use std::collections::HashMap;

        // JSON object keys must be strings.
        let body: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);
        let resp = to_json(&body).unwrap_err();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(to_json(&[1, 2]).is_ok());
    }

    #[test]
    fn malformed_id_is_bad_request() {
        let resp = parse_param::<ProductId>("not-a-uuid").unwrap_err();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
