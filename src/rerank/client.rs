//! Upstream rerank API client.
//!
//! Each call is a single best-effort `POST`: no retry, no backoff, no cache,
//! and no timeout beyond what the HTTP stack imposes on its own.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::error::RerankError;
use crate::rerank::types::{RerankRequest, RerankResponse};

/// The ZeroEntropy rerank endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.zeroentropy.dev/v1/models/rerank";

/// Something that can rank documents against a query.
#[async_trait]
pub trait RerankClient: Send + Sync {
    /// Ranks `request.documents()` by relevance to `request.query()`.
    async fn rerank(&self, request: &RerankRequest) -> Result<RerankResponse, RerankError>;
}

/// Body sent upstream. The API key travels in the header only.
#[derive(Serialize)]
struct UpstreamBody<'a> {
    query: &'a str,
    documents: &'a [String],
}

/// [`RerankClient`] backed by the ZeroEntropy HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRerankClient {
    client: Client,
    endpoint: String,
}

impl HttpRerankClient {
    /// Creates a client for the default endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Creates a client for a custom endpoint.
    #[must_use]
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// The endpoint requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for HttpRerankClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RerankClient for HttpRerankClient {
    async fn rerank(&self, request: &RerankRequest) -> Result<RerankResponse, RerankError> {
        let body = UpstreamBody {
            query: request.query(),
            documents: request.documents(),
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            documents = request.documents().len(),
            "Sending rerank request"
        );

        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(request.api_key())
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::UNAUTHORIZED => RerankError::Auth,
                StatusCode::TOO_MANY_REQUESTS => RerankError::RateLimited,
                other => RerankError::Upstream {
                    status: other.as_u16(),
                },
            });
        }

        let payload: Value = res.json().await?;
        let response = RerankResponse::from_upstream(&payload)?;

        tracing::debug!(results = response.results.len(), "Rerank request completed");

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_is_zeroentropy() {
        let client = HttpRerankClient::default();
        assert_eq!(client.endpoint(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn upstream_body_omits_api_key() {
        let documents = vec!["a".to_string(), "b".to_string()];
        let body = UpstreamBody {
            query: "ml",
            documents: &documents,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"query": "ml", "documents": ["a", "b"]}));
    }
}
