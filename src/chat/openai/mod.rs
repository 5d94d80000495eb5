#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::chat::{ChatMessage, ChatProvider};
use crate::config::ChatConfig;
use crate::{RagError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
///
/// Like the embedding client, this performs no retries; transient failures
/// propagate as `RateLimited` or `ProviderUnavailable`.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    base_url: Url,
    api_key: String,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

impl OpenAiChatClient {
    #[inline]
    pub fn new(config: &ChatConfig) -> Result<Self> {
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

    fn completions_url(&self) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/chat/completions", base))
            .map_err(|e| RagError::Config(format!("Failed to build completions URL: {}", e)))
    }
}

impl ChatProvider for OpenAiChatClient {
    #[inline]
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        if messages.is_empty() {
            return Err(RagError::InvalidInput(
                "completion request needs at least one message".to_string(),
            ));
        }

        let request = CompletionRequest {
            model: &self.model,
            messages,
        };

        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::InvalidInput(format!("Unserializable request: {}", e)))?;

        let url = self.completions_url()?;
        debug!(
            "Requesting completion from {} (model {}, {} messages)",
            url,
            self.model,
            messages.len()
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

        let response: CompletionResponse = serde_json::from_str(&response_text).map_err(|e| {
            RagError::ProviderUnavailable(format!("Unparseable completion response: {}", e))
        })?;

        let first_choice = response.choices.into_iter().next().ok_or_else(|| {
            RagError::ProviderUnavailable("completion response had no choices".to_string())
        })?;

        debug!(
            "Received completion ({} chars)",
            first_choice.message.content.len()
        );
        Ok(first_choice.message.content)
    }
}

fn classify_transport_error(error: ureq::Error) -> RagError {
    match error {
        ureq::Error::StatusCode(429) => {
            RagError::RateLimited("HTTP 429 from chat provider".to_string())
        }
        ureq::Error::StatusCode(status) => {
            RagError::ProviderUnavailable(format!("HTTP {} from chat provider", status))
        }
        ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Io(_) => RagError::ProviderUnavailable(error.to_string()),
        other => RagError::ProviderUnavailable(other.to_string()),
    }
}
