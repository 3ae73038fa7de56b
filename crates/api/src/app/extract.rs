//! Request body extraction with the API's JSON error shape.

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::response::Response;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::app::errors;

/// `Json<T>`, but a body that cannot be read or parsed is answered with
/// `{"error", "message"}` like every other failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_to_response(rejection)),
        }
    }
}

pub fn rejection_to_response(rejection: JsonRejection) -> Response {
    let code = match &rejection {
        // Well-formed JSON that does not fit the expected shape or values.
        JsonRejection::JsonDataError(_) => "validation_error",
        JsonRejection::MissingJsonContentType(_) => "unsupported_media_type",
        _ => "invalid_body",
    };
    errors::json_error(rejection.status(), code, rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Adjust {
        quantity: i64,
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn rejected(req: Request) -> (StatusCode, serde_json::Value) {
        let resp = JsonBody::<Adjust>::from_request(req, &()).await.unwrap_err();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn malformed_bodies_use_the_error_shape() {
        let (status, body) = rejected(request(Some("application/json"), "{\"quantity\":")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_body");

        let (status, body) = rejected(request(Some("application/json"), "{\"quantity\":\"ten\"}")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_error");
        assert!(body["message"].as_str().is_some());

        let (status, body) = rejected(request(None, "{}")).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["error"], "unsupported_media_type");
    }

    #[tokio::test]
    async fn valid_body_is_extracted() {
        let req = request(Some("application/json"), "{\"quantity\":3}");
        let JsonBody(adjust) = JsonBody::<Adjust>::from_request(req, &()).await.unwrap();
        assert_eq!(adjust.quantity, 3);
    }
}
