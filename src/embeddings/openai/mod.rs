
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::EmbeddingConfig;
use crate::embeddings::EmbeddingProvider;
use crate::{RagError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Client for an OpenAI-compatible `/embeddings` endpoint.
///
/// The provider may truncate overlong input at its own token limit (8192
/// tokens for the ada/3-series models); callers do not pre-truncate.
/// No retry is built in: `RateLimited` and `ProviderUnavailable` propagate
/// and retry policy belongs to the caller.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingClient {
    base_url: Url,
    api_key: String,
    model: String,
    dimensions: usize,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingClient {
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let base_url = config
            .endpoint_url()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions as usize,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    fn embeddings_url(&self) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/embeddings", base))
            .map_err(|e| RagError::Config(format!("Failed to build embeddings URL: {}", e)))
    }

    fn request_embeddings(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingsRequest {
            model: &self.model,
            input: inputs,
            encoding_format: "float",
        };

        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::InvalidInput(format!("Unserializable request: {}", e)))?;

        let url = self.embeddings_url()?;
        debug!(
            "Requesting {} embeddings from {} (model {})",
            inputs.len(),
            url,
            self.model
        );

        let mut request_builder = self.agent.post(url.as_str()).header("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            request_builder =
                request_builder.header("Authorization", &format!("Bearer {}", self.api_key));
        }

        let response_text = request_builder
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(classify_transport_error)?;

        let response: EmbeddingsResponse = serde_json::from_str(&response_text).map_err(|e| {
            RagError::ProviderUnavailable(format!("Unparseable embeddings response: {}", e))
        })?;

        if response.data.len() != inputs.len() {
            return Err(RagError::ProviderUnavailable(format!(
                "Embeddings response count mismatch: sent {}, received {}",
                inputs.len(),
                response.data.len()
            )));
        }

        let vectors: Vec<Vec<f32>> = response.data.into_iter().map(|d| d.embedding).collect();

        for vector in &vectors {
            if vector.len() != self.dimensions {
                warn!(
                    "Provider returned a {}-dimensional vector, expected {}",
                    vector.len(),
                    self.dimensions
                );
                return Err(RagError::SchemaMismatch(format!(
                    "embedding has {} dimensions, index declares {}",
                    vector.len(),
                    self.dimensions
                )));
            }
        }

        debug!("Received {} embeddings", vectors.len());
        Ok(vectors)
    }
}

impl EmbeddingProvider for OpenAiEmbeddingClient {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(RagError::InvalidInput(
                "cannot embed empty text".to_string(),
            ));
        }

        let inputs = [text.to_string()];
        let mut vectors = self.request_embeddings(&inputs)?;
        // Length was validated against the request above.
        vectors
            .pop()
            .ok_or_else(|| RagError::ProviderUnavailable("empty embeddings response".to_string()))
    }

    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(RagError::InvalidInput(
                "cannot embed empty text".to_string(),
            ));
        }

        self.request_embeddings(texts)
    }

    #[inline]
    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Map ureq failures onto the crate taxonomy: 429 is throttling, everything
/// else from the transport or the provider counts as unavailable.
fn classify_transport_error(error: ureq::Error) -> RagError {
    match error {
        ureq::Error::StatusCode(429) => {
            RagError::RateLimited("HTTP 429 from embedding provider".to_string())
        }
        ureq::Error::StatusCode(status) => {
            RagError::ProviderUnavailable(format!("HTTP {} from embedding provider", status))
        }
        ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Io(_) => RagError::ProviderUnavailable(error.to_string()),
        other => RagError::ProviderUnavailable(other.to_string()),
    }
}
