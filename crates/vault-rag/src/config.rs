//! Configuration for the question-answering service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable (and secrets key) holding the generation API credential
pub const API_KEY_VAR: &str = "GROQ_API_KEY";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Hosted generation model configuration
    pub llm: LlmConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Ingestion configuration
    pub ingestion: IngestionConfig,
    /// Secret store file (TOML with a `GROQ_API_KEY` entry)
    pub secrets_path: PathBuf,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama server
    #[default]
    Ollama,
    /// Local ONNX runtime (requires the `onnx` feature)
    Onnx,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend
    pub backend: EmbeddingBackend,
    /// Ollama base URL
    pub base_url: String,
    /// Model name (Ollama tag, or sentence-transformers repo for ONNX)
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// Batch size for local inference
    pub batch_size: usize,
    /// Maximum sequence length for local inference
    pub max_length: usize,
    /// Cache directory for downloaded models
    pub cache_dir: PathBuf,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Ollama,
            base_url: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            batch_size: 32,
            max_length: 256,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("vault-rag")
                .join("models"),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Hosted generation model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL
    pub base_url: String,
    /// Which hosted model to call
    pub model_name: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
    /// API credential, resolved from the secret store or environment
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model_name: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.0,
            timeout_secs: 60,
            max_retries: 2,
            api_key: None,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the generator
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Files processed concurrently per batch (default: CPU count, max 8)
    pub parallel_files: Option<usize>,
    /// Upper bound for the fallback PDF text extractor, in seconds
    pub pdf_timeout_secs: u64,
    /// Directory for temporary upload files (default: system temp dir)
    pub temp_dir: Option<PathBuf>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            parallel_files: None,
            pdf_timeout_secs: 60,
            temp_dir: None,
        }
    }
}

impl IngestionConfig {
    /// Effective number of files processed at once
    pub fn effective_parallel_files(&self) -> usize {
        self.parallel_files
            .unwrap_or_else(|| num_cpus::get().min(8))
            .max(1)
    }
}

#[derive(Deserialize)]
struct SecretsFile {
    #[serde(rename = "GROQ_API_KEY")]
    groq_api_key: Option<String>,
}

impl RagConfig {
    /// Load configuration: file (or defaults), `.env`, environment overrides,
    /// API credential, then validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Err(e) = dotenv::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }

        config.apply_env_overrides()?;
        config.llm.api_key = config.resolve_api_key()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string; missing fields take defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(host) = env_string("VAULT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse("VAULT_PORT")? {
            self.server.port = port;
        }
        if let Some(model) = env_string("VAULT_MODEL_NAME") {
            self.llm.model_name = model;
        }
        if let Some(url) = env_string("VAULT_LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(url) = env_string("VAULT_EMBED_BASE_URL") {
            self.embeddings.base_url = url;
        }
        if let Some(model) = env_string("VAULT_EMBED_MODEL") {
            self.embeddings.model = model;
        }
        if let Some(size) = env_parse("VAULT_CHUNK_SIZE")? {
            self.chunking.chunk_size = size;
        }
        if let Some(overlap) = env_parse("VAULT_CHUNK_OVERLAP")? {
            self.chunking.chunk_overlap = overlap;
        }
        if let Some(top_k) = env_parse("VAULT_TOP_K")? {
            self.retrieval.top_k = top_k;
        }
        Ok(())
    }

    /// Secret store first, environment second
    fn resolve_api_key(&self) -> Result<Option<String>> {
        if let Some(key) = read_secret_store(&self.secrets_path)? {
            tracing::info!("API credential loaded from {}", self.secrets_path.display());
            return Ok(Some(key));
        }
        Ok(env_string(API_KEY_VAR))
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than zero".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be greater than zero".into()));
        }
        if self.llm.model_name.trim().is_empty() {
            return Err(Error::Config("llm.model_name must not be empty".into()));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be greater than zero".into()));
        }
        Ok(())
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            embeddings: EmbeddingConfig::default(),
            chunking: ChunkingConfig::default(),
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            ingestion: IngestionConfig::default(),
            secrets_path: PathBuf::from(".vault").join("secrets.toml"),
        }
    }
}

fn read_secret_store(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let secrets: SecretsFile = toml::from_str(&content)?;
    Ok(secrets
        .groq_api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty()))
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env_string(name) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", name, raw))),
        None => Ok(None),
    }
}
