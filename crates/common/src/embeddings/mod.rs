//! Embedding service abstraction
//!
//! Turns query text into a fixed-dimension vector:
//! - OpenAI (text-embedding-3-small, text-embedding-ada-002, text-embedding-3-large)
//! - Mock provider for local development
//!
//! Providers never retry. Empty input is rejected before any request is made
//! and long input is cut to the configured character budget.

use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Maximum characters submitted to the provider
pub const DEFAULT_MAX_INPUT_CHARS: usize = 8000;

/// Embedding produced by an [`Embedder`]. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }
}

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// Reject blank input and cut the rest to `max_chars` characters.
pub fn prepare_input(text: &str, max_chars: usize) -> Result<Cow<'_, str>> {
    if text.trim().is_empty() {
        return Err(AppError::EmptyInput);
    }

    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            tracing::info!(
                original_chars = text.chars().count(),
                max_chars,
                "Embedding input truncated"
            );
            metrics::record_truncation();
            Ok(Cow::Owned(text[..byte_idx].to_string()))
        }
        None => Ok(Cow::Borrowed(text)),
    }
}

/// OpenAI embedding client
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimension: usize,
    base_url: String,
    max_input_chars: usize,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    data: Vec<OpenAIEmbedding>,
}

#[derive(Deserialize)]
struct OpenAIEmbedding {
    embedding: Vec<f32>,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder
    pub fn new(api_key: String, config: &EmbeddingConfig) -> Result<Self> {
        let dimension = match config.model.as_str() {
            "text-embedding-ada-002" => 1536,
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            _ => config.dimension,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::ServiceNotInitialized {
                service: "embedding".to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            dimension,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            max_input_chars: config.max_input_chars,
        })
    }

    async fn make_request(&self, text: &str) -> Result<EmbeddingVector> {
        let url = format!("{}/embeddings", self.base_url);

        let request = OpenAIRequest {
            input: text,
            model: &self.model,
        };

        let response = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::EmbeddingFailure {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmbeddingFailure {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: OpenAIResponse = response.json().await.map_err(|e| {
            AppError::EmbeddingFailure {
                message: format!("Failed to parse response: {}", e),
            }
        })?;

        first_embedding(result)
    }
}

fn first_embedding(response: OpenAIResponse) -> Result<EmbeddingVector> {
    response
        .data
        .into_iter()
        .next()
        .filter(|e| !e.embedding.is_empty())
        .map(|e| EmbeddingVector::new(e.embedding))
        .ok_or_else(|| AppError::EmbeddingFailure {
            message: "Empty response".to_string(),
        })
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let input = prepare_input(text, self.max_input_chars)?;

        let start = Instant::now();
        let result = self.make_request(&input).await;
        metrics::record_embedding(start.elapsed().as_secs_f64(), &self.model, result.is_ok());

        let embedding = result?;
        tracing::debug!(dimension = embedding.dimension(), "Embedding generated");
        Ok(embedding)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Mock embedder for local development
pub struct MockEmbedder {
    dimension: usize,
    max_input_chars: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize, max_input_chars: usize) -> Self {
        Self {
            dimension,
            max_input_chars,
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.dimension, config.max_input_chars)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        use rand::Rng;
        prepare_input(text, self.max_input_chars)?;
        let mut rng = rand::thread_rng();
        Ok(EmbeddingVector::new(
            (0..self.dimension).map(|_| rng.gen_range(-1.0..1.0)).collect(),
        ))
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "openai" => {
            let key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
                message: "embedding.api_key is required for the openai provider".to_string(),
            })?;
            Ok(Arc::new(OpenAIEmbedder::new(key, config)?))
        }
        "mock" => {
            tracing::warn!("Using mock embedder, retrieval results will be random");
            Ok(Arc::new(MockEmbedder::from_config(config)))
        }
        other => Err(AppError::Configuration {
            message: format!("Unknown embedding provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input_rejected() {
        assert!(matches!(prepare_input("", 10), Err(AppError::EmptyInput)));
        assert!(matches!(prepare_input(" \n\t ", 10), Err(AppError::EmptyInput)));
    }

    #[test]
    fn test_short_input_borrowed() {
        let input = prepare_input("retail analytics", 8000).unwrap();
        assert!(matches!(input, Cow::Borrowed("retail analytics")));
    }

    #[test]
    fn test_truncation_on_char_boundary() {
        let text = "кейс".repeat(3000);
        let input = prepare_input(&text, DEFAULT_MAX_INPUT_CHARS).unwrap();
        assert_eq!(input.chars().count(), DEFAULT_MAX_INPUT_CHARS);
        assert!(text.starts_with(input.as_ref()));
    }

    #[test]
    fn test_exact_budget_not_truncated() {
        let text = "a".repeat(8000);
        let input = prepare_input(&text, 8000).unwrap();
        assert_eq!(input.len(), 8000);
    }

    #[test]
    fn test_response_parsing() {
        let response: OpenAIResponse = serde_json::from_str(
            r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.1,-0.2,0.3]}],"model":"text-embedding-3-small"}"#,
        )
        .unwrap();
        let embedding = first_embedding(response).unwrap();
        assert_eq!(embedding.as_slice(), &[0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_empty_response_is_failure() {
        let response: OpenAIResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(matches!(
            first_embedding(response),
            Err(AppError::EmbeddingFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_embedder() {
        let embedder = MockEmbedder::new(1536, DEFAULT_MAX_INPUT_CHARS);
        let embedding = embedder.embed("test text").await.unwrap();
        assert_eq!(embedding.dimension(), 1536);
    }

    #[tokio::test]
    async fn test_mock_embedder_rejects_blank() {
        let embedder = MockEmbedder::new(8, DEFAULT_MAX_INPUT_CHARS);
        assert!(matches!(embedder.embed("   ").await, Err(AppError::EmptyInput)));
    }

    #[test]
    fn test_mock_embedder_uses_configured_budget() {
        let config = EmbeddingConfig {
            provider: "mock".to_string(),
            dimension: 16,
            max_input_chars: 500,
            ..EmbeddingConfig::default()
        };
        let embedder = MockEmbedder::from_config(&config);
        assert_eq!(embedder.max_input_chars, 500);
        assert_eq!(embedder.dimension, 16);
        assert_eq!(create_embedder(&config).unwrap().dimension(), 16);
    }

    #[test]
    fn test_openai_requires_key() {
        let config = EmbeddingConfig::default();
        assert!(matches!(
            create_embedder(&config),
            Err(AppError::Configuration { .. })
        ));
    }

    #[test]
    fn test_dimension_from_model() {
        let config = EmbeddingConfig {
            model: "text-embedding-3-large".to_string(),
            ..EmbeddingConfig::default()
        };
        let embedder = OpenAIEmbedder::new("sk-test".to_string(), &config).unwrap();
        assert_eq!(embedder.dimension(), 3072);
        assert_eq!(embedder.model_name(), "text-embedding-3-large");
    }
}
