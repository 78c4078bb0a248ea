//! Application state for the HTTP server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::GroqClient;
use crate::providers::{build_embedder, LlmProvider};
use crate::session::Session;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    session: Arc<Session>,
}

impl AppState {
    /// Build providers and the session from configuration
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!(
            "Initializing application state (embeddings: {:?} {}, model: {})",
            config.embeddings.backend,
            config.embeddings.model,
            config.llm.model_name
        );

        let embedder = build_embedder(&config.embeddings).await?;
        match embedder.health_check().await {
            Ok(true) => tracing::info!("Embedding backend {} is available", embedder.name()),
            _ => tracing::warn!(
                "Embedding backend {} is not reachable at {}; ingestion will fail until it is",
                embedder.name(),
                config.embeddings.base_url
            ),
        }

        let llm: Arc<dyn LlmProvider> = Arc::new(GroqClient::new(&config.llm)?);
        let session = Session::from_config(&config, embedder, llm)?;

        tracing::info!("Session {} created", session.id());

        Ok(Self::from_parts(config, Arc::new(session)))
    }

    /// Wrap an existing session
    pub fn from_parts(config: RagConfig, session: Arc<Session>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, session }),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.inner.session
    }

    /// Whether questions can be answered from documents
    pub fn is_ready(&self) -> bool {
        self.inner.session.status().state == crate::types::KnowledgeState::Ready
    }
}
