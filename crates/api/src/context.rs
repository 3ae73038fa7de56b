use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

/// Header naming who performed a request. Recorded on stock movements; no
/// authentication is attached to it.
pub const ACTOR_HEADER: &str = "x-actor";

const MAX_ACTOR_LEN: usize = 255;

/// Who is acting on this request, if the client said so.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorContext {
    actor: Option<String>,
}

impl ActorContext {
    pub fn new(actor: Option<String>) -> Self {
        Self { actor }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let actor = headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| v.chars().take(MAX_ACTOR_LEN).collect());
        Self { actor }
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    pub fn into_actor(self) -> Option<String> {
        self.actor
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn blank_header_means_no_actor() {
        let mut headers = HeaderMap::new();
        assert_eq!(ActorContext::from_headers(&headers).actor(), None);

        headers.insert(ACTOR_HEADER, HeaderValue::from_static("   "));
        assert_eq!(ActorContext::from_headers(&headers).actor(), None);

        headers.insert(ACTOR_HEADER, HeaderValue::from_static(" alice "));
        assert_eq!(ActorContext::from_headers(&headers).actor(), Some("alice"));
    }
}
