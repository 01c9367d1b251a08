
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::OllamaConfig;
use crate::memory::ChatMessage;
use crate::{PlaygroundError, Result};

/// Per-call model settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatOptions {
    pub temperature: f32,
}

impl Default for ChatOptions {
    #[inline]
    fn default() -> Self {
        Self { temperature: 0.7 }
    }
}

impl ChatOptions {
    #[inline]
    pub fn with_temperature(temperature: f32) -> Self {
        Self { temperature }
    }
}

/// Async client for the Ollama chat and completion endpoints.
///
/// Calls carry a client-level timeout and are never retried; a timeout or
/// transport failure surfaces as `ProviderFailure`.
#[derive(Debug, Clone)]
pub struct ChatClient {
    base_url: Url,
    model: String,
    http: Client,
}

#[derive(Debug, Serialize)]
struct ModelOptions {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: ModelOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ModelOptions,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

impl ChatClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .base_url()
            .map_err(|e| PlaygroundError::Config(e.to_string()))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| PlaygroundError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            model: config.chat_model.clone(),
            http,
        })
    }

    /// One completion call: prompt in, text out
    #[inline]
    pub async fn generate(&self, prompt: &str, options: ChatOptions) -> Result<String> {
        debug!(
            "Generating completion with model {} (prompt length: {})",
            self.model,
            prompt.len()
        );

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: ModelOptions {
                temperature: options.temperature,
            },
        };

        let response: GenerateResponse = self.post_json("/api/generate", &request).await?;
        Ok(response.response)
    }

    /// One chat call: ordered message list in, assistant text out
    #[inline]
    pub async fn chat(&self, messages: &[ChatMessage], options: ChatOptions) -> Result<String> {
        debug!(
            "Sending chat request with model {} ({} messages)",
            self.model,
            messages.len()
        );

        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: ModelOptions {
                temperature: options.temperature,
            },
        };

        let response: ChatResponse = self.post_json("/api/chat", &request).await?;
        Ok(response.message.content)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| PlaygroundError::Config(format!("Failed to build URL for {}: {}", path, e)))?;

        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| provider_error(path, &e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PlaygroundError::ProviderFailure(format!(
                "{} returned HTTP {}: {}",
                path, status, detail
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PlaygroundError::ProviderFailure(format!(
                "Failed to parse {} response: {}",
                path, e
            )))
    }
}

/// Map transport errors to the provider failure kind, calling out timeouts
pub(crate) fn provider_error(context: &str, e: &reqwest::Error) -> PlaygroundError {
    if e.is_timeout() {
        PlaygroundError::ProviderFailure(format!("{} timed out", context))
    } else {
        PlaygroundError::ProviderFailure(format!("{} failed: {}", context, e))
    }
}
