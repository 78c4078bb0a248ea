//! Request types

use serde::{Deserialize, Serialize};

/// Question request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// The question to answer
    pub question: String,
}

/// Per-request ingestion overrides, sent as the `options` multipart field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestOptions {
    /// Chunk size override
    #[serde(default)]
    pub chunk_size: Option<usize>,
    /// Chunk overlap override
    #[serde(default)]
    pub chunk_overlap: Option<usize>,
}
