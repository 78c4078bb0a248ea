//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Trait for generating text embeddings
///
/// Implementations must be deterministic: the same text and configuration
/// always produce the same vector.
///
/// Implementations:
/// - `OllamaEmbedder`: Ollama server (all-minilm)
/// - `LocalOnnxEmbedder`: ONNX runtime, all-MiniLM-L6-v2 (feature `onnx`)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch), in input order
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Embedding dimensions (384 for MiniLM)
    fn dimensions(&self) -> usize;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Reject vectors whose length disagrees with the provider's dimensions
pub fn check_dimensions(provider: &dyn EmbeddingProvider, vector: &[f32]) -> Result<()> {
    if vector.len() != provider.dimensions() {
        return Err(Error::validation(format!(
            "{} returned a {}-dimensional embedding, expected {}",
            provider.name(),
            vector.len(),
            provider.dimensions()
        )));
    }
    Ok(())
}
