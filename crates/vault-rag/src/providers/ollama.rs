//! Ollama embedding provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::retry::{Failure, RetryPolicy};

use super::embedding::{check_dimensions, EmbeddingProvider};

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Embeddings from an Ollama server (all-minilm by default)
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    retry: RetryPolicy,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn request_embedding(&self, text: &str) -> std::result::Result<Vec<f32>, Failure> {
        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| {
                Failure::Transient(Error::service(format!("Embedding request failed: {}", e)))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Failure::from_status(
                status,
                Error::service(format!("Embedding failed: HTTP {} - {}", status, body)),
            ));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| {
                Failure::Transient(Error::service(format!(
                    "Failed to parse embedding response: {}",
                    e
                )))
            })?;

        Ok(parsed.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self
            .retry
            .run("Embedding request", move || self.request_embedding(text))
            .await?;
        check_dimensions(self, &embedding)?;
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_mock_server;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn embedder_for(base_url: String, dimensions: usize) -> OllamaEmbedder {
        let config = EmbeddingConfig {
            base_url,
            dimensions,
            ..EmbeddingConfig::default()
        };
        OllamaEmbedder::new(&config)
            .unwrap()
            .with_retry(RetryPolicy::immediate(0))
    }

    #[tokio::test]
    async fn test_embed_parses_response() {
        let router = Router::new().route(
            "/api/embeddings",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "all-minilm");
                Json(json!({ "embedding": [0.5, 0.25, 0.125] }))
            }),
        );
        let base_url = spawn_mock_server(router).await;

        let embedding = embedder_for(base_url, 3).embed("hello").await.unwrap();
        assert_eq!(embedding, vec![0.5, 0.25, 0.125]);
    }

    #[tokio::test]
    async fn test_wrong_dimensions_is_validation_error() {
        let router = Router::new().route(
            "/api/embeddings",
            post(|| async { Json(json!({ "embedding": [1.0, 2.0] })) }),
        );
        let base_url = spawn_mock_server(router).await;

        let err = embedder_for(base_url, 384).embed("hello").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_model_is_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let hits = counter.clone();
        let router = Router::new().route(
            "/api/embeddings",
            post(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::NOT_FOUND, "model 'all-minilm' not found")
                }
            }),
        );
        let base_url = spawn_mock_server(router).await;

        let err = embedder_for(base_url, 3)
            .with_retry(RetryPolicy::immediate(3))
            .embed("hello")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_service_error() {
        // Nothing listens on port 9 (discard) in the test environment
        let err = embedder_for("http://127.0.0.1:9".to_string(), 3)
            .embed("hello")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
