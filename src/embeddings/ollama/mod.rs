
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::OllamaConfig;
use crate::llm::provider_error;
use crate::{PlaygroundError, Result};

/// Async client for the Ollama embedding endpoint.
///
/// Batch embedding is all-or-nothing: if any request fails, the whole
/// operation fails and the caller gets no partial result. Calls are never
/// retried.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    base_url: Url,
    model: String,
    batch_size: usize,
    http: Client,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl EmbeddingClient {
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
            model: config.embedding_model.clone(),
            batch_size: config.batch_size as usize,
            http,
        })
    }

    /// Embed a single text
    #[inline]
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request_embeddings(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            PlaygroundError::ProviderFailure("Provider returned no embedding".to_string())
        })
    }

    /// Embed many texts, preserving order.
    ///
    /// Requests go out in batches of the configured size; the first failure
    /// aborts the whole operation.
    #[inline]
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts with model {}", texts.len(), self.model);

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size.max(1)) {
            let batch_vectors = self.request_embeddings(batch).await?;
            vectors.extend(batch_vectors);
        }

        if let Some(first) = vectors.first() {
            let dimension = first.len();
            if vectors.iter().any(|v| v.len() != dimension) {
                return Err(PlaygroundError::ProviderFailure(
                    "Provider returned embeddings of mixed dimensions".to_string(),
                ));
            }
        }

        debug!("Generated {} embeddings", vectors.len());
        Ok(vectors)
    }

    async fn request_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self
            .base_url
            .join("/api/embed")
            .map_err(|e| PlaygroundError::Config(format!("Failed to build embed URL: {}", e)))?;

        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| provider_error("/api/embed", &e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PlaygroundError::ProviderFailure(format!(
                "/api/embed returned HTTP {}: {}",
                status, detail
            )));
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            PlaygroundError::ProviderFailure(format!("Failed to parse embed response: {}", e))
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(PlaygroundError::ProviderFailure(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }

        Ok(parsed.embeddings)
    }
}
