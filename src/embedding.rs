//! Dense vector embedding via an Ollama-style embedding endpoint

use crate::config::EmbeddingConfig;
use crate::error::{EmbeddingError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Trait for embedding operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Encode a single query string
    async fn encode_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Encode a batch of texts; callers may pass arbitrarily large batches
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embedding dimension, known after the first successful call
    fn dimension(&self) -> Option<usize>;
}

/// Ollama embedding client.
///
/// The model identifier is fixed at construction. The embedding dimension
/// is discovered on the first successful call and published through a
/// write-once cell, so later readers never take a lock.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    config: EmbeddingConfig,
    dimension: OnceLock<usize>,
}

/// Ollama API request for embeddings
#[derive(Debug, Serialize)]
struct OllamaEmbedRequest {
    model: String,
    prompt: String,
}

/// Ollama API response for embeddings
#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    /// Create a new embedding client
    pub fn new(config: EmbeddingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            dimension: OnceLock::new(),
        }
    }

    fn api_url(&self) -> String {
        format!("{}/api/embeddings", self.config.url.trim_end_matches('/'))
    }

    /// One embedding request without retries
    async fn embed_once(&self, text: &str) -> Result<Vec<f32>> {
        let request = OllamaEmbedRequest {
            model: self.config.model.clone(),
            prompt: text.to_string(),
        };

        let response = timeout(
            Duration::from_secs(self.config.timeout),
            self.client.post(self.api_url()).json(&request).send(),
        )
        .await
        .map_err(|_| EmbeddingError::Timeout)?
        .map_err(|e| EmbeddingError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Embedding API error: {}", error_text);
            return Err(EmbeddingError::EncodingFailed(error_text).into());
        }

        let embed_response: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if embed_response.embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse("empty embedding".to_string()).into());
        }

        // First successful call publishes the dimension
        if let Some(&expected) = self.dimension.get() {
            if embed_response.embedding.len() != expected {
                return Err(EmbeddingError::InvalidDimension {
                    expected,
                    actual: embed_response.embedding.len(),
                }
                .into());
            }
        } else if self.dimension.set(embed_response.embedding.len()).is_ok() {
            info!(
                "Embedding dimension discovered: {}",
                embed_response.embedding.len()
            );
        }

        Ok(embed_response.embedding)
    }

    /// Embed with bounded exponential-backoff retries on transport errors
    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>> {
        let mut last_error = None;
        let max_attempts = self.config.max_retries + 1;

        for attempt in 1..=max_attempts {
            match self.embed_once(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) => {
                    if !e.is_retryable() || attempt == max_attempts {
                        return Err(e);
                    }
                    warn!(
                        "Embedding attempt {}/{} failed: {}",
                        attempt, max_attempts, e
                    );
                    last_error = Some(e);
                    let delay = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| EmbeddingError::EncodingFailed("no attempts made".to_string()).into()))
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn encode_query(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Encoding query of length {}", text.len());
        self.embed_with_retry(text).await
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!("Encoding batch of {} texts", texts.len());

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size) {
            for text in batch {
                embeddings.push(self.embed_with_retry(text).await?);
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension.get().copied()
    }
}
