//! Firebase Realtime Database REST sink.
//!
//! `PUT {database_url}/{path}.json` replaces the node at `path` in one request,
//! which gives the delete-then-write semantics a full collection push needs.

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::{ReplicaError, ReplicaSink};
use crate::config::FirebaseConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct FirebaseRestSink {
    client: reqwest::Client,
    database_url: String,
    auth_token: Option<String>,
}

impl FirebaseRestSink {
    pub fn new(config: &FirebaseConfig) -> Result<Self, ReplicaError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ReplicaError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            database_url: config.database_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn node_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.database_url, path.trim_matches('/'))
    }
}

#[async_trait::async_trait]
impl ReplicaSink for FirebaseRestSink {
    #[instrument(skip(self, records), fields(records = records.len()), err)]
    async fn replace_collection(
        &self,
        path: &str,
        records: Map<String, Value>,
    ) -> Result<(), ReplicaError> {
        let mut req = self.client.put(self.node_url(path)).json(&records);
        if let Some(token) = &self.auth_token {
            req = req.query(&[("auth", token)]);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ReplicaError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ReplicaError::Rejected {
                path: path.to_string(),
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        debug!(path, "replica collection replaced");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "firebase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_url_joins_without_double_slashes() {
        let sink = FirebaseRestSink::new(&FirebaseConfig {
            database_url: "https://demo.firebaseio.com/".into(),
            auth_token: None,
        })
        .unwrap();
        assert_eq!(
            sink.node_url("/products/"),
            "https://demo.firebaseio.com/products.json"
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let sink = FirebaseRestSink::new(&FirebaseConfig {
            database_url: "http://127.0.0.1:9".into(),
            auth_token: Some("t".into()),
        })
        .unwrap();
        let err = sink
            .replace_collection("products", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ReplicaError::Transport(_)));
    }
}
