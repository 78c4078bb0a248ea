//! Provider abstractions for embeddings and the hosted generation model
//!
//! Trait-based so the session can run against Ollama, a local ONNX model,
//! or test doubles.

pub mod embedding;
pub mod llm;
pub mod ollama;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use ollama::OllamaEmbedder;
#[cfg(feature = "onnx")]
pub use onnx::LocalOnnxEmbedder;

use std::sync::Arc;

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::error::{Error, Result};

/// Build the embedding provider selected in the configuration
pub async fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.backend {
        EmbeddingBackend::Ollama => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        #[cfg(feature = "onnx")]
        EmbeddingBackend::Onnx => Ok(Arc::new(LocalOnnxEmbedder::new(config).await?)),
        #[cfg(not(feature = "onnx"))]
        EmbeddingBackend::Onnx => Err(Error::Config(
            "embeddings.backend = \"onnx\" requires building with the `onnx` feature".into(),
        )),
    }
}
