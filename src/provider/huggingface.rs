//! Embedding provider backed by the Hugging Face inference API.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{EmbeddingProvider, ProviderError};

const PROVIDER: &str = "Hugging Face";

/// Default inference endpoint; overridable for tests and self-hosted setups.
pub const DEFAULT_HF_BASE_URL: &str = "https://api-inference.huggingface.co/models";

/// [`EmbeddingProvider`] over the Hugging Face feature-extraction endpoint.
///
/// Sends `{"inputs": texts}` to `{base_url}/{model}` and expects one vector
/// of numbers per input text, in input order.
pub struct HuggingFaceEmbeddingProvider {
    client: reqwest::Client,
    api_token: String,
    base_url: String,
}

impl HuggingFaceEmbeddingProvider {
    pub fn new(api_token: &str) -> Self {
        Self::with_base_url(api_token, DEFAULT_HF_BASE_URL)
    }

    pub fn with_base_url(api_token: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_token: api_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbeddingProvider {
    async fn embed(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>, ProviderError> {
        let url = format!("{}/{}", self.base_url, model);
        debug!(url = %url, texts = texts.len(), "requesting embeddings");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&json!({ "inputs": texts }))
            .send()
            .await
            .map_err(|e| ProviderError::Transport {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string();
            return Err(ProviderError::http(PROVIDER, status.as_u16(), message));
        }

        let body: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| ProviderError::MalformedResponse {
                    provider: PROVIDER,
                    reason: e.to_string(),
                })?;

        parse_embeddings(body, texts.len())
    }
}

/// Validates the response shape: a non-empty array of arrays of numbers,
/// one per input text.
fn parse_embeddings(body: serde_json::Value, expected: usize) -> Result<Vec<Vec<f32>>, ProviderError> {
    if let Some(error) = body.get("error").and_then(|e| e.as_str()) {
        return Err(ProviderError::Other {
            provider: PROVIDER,
            message: error.to_string(),
        });
    }

    let embeddings: Vec<Vec<f32>> =
        serde_json::from_value(body).map_err(|_| ProviderError::MalformedResponse {
            provider: PROVIDER,
            reason: "embeddings returned are not arrays of numbers as expected".to_string(),
        })?;

    if embeddings.is_empty() || embeddings.len() != expected {
        return Err(ProviderError::MalformedResponse {
            provider: PROVIDER,
            reason: format!(
                "expected {} embedding vectors, got {}",
                expected,
                embeddings.len()
            ),
        });
    }

    Ok(embeddings)
}
