//! Document ingestion: PDF loading and chunking

mod chunker;
mod loader;

pub use chunker::TextChunker;
pub use loader::PdfLoader;

use crate::error::{Error, Result};
use crate::types::{DocumentChunk, PageRecord};

/// A file after loading and chunking, ready for embedding
#[derive(Debug, Clone)]
pub struct PreparedFile {
    /// Original filename
    pub source_name: String,
    /// Pages with extractable text
    pub pages: Vec<PageRecord>,
    /// Chunks in document order
    pub chunks: Vec<DocumentChunk>,
}

/// Load + chunk for a single file
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    loader: PdfLoader,
    chunker: TextChunker,
}

impl IngestPipeline {
    /// Create a pipeline
    pub fn new(loader: PdfLoader, chunker: TextChunker) -> Self {
        Self { loader, chunker }
    }

    /// The chunker in use
    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    /// Same loader, different chunking parameters
    pub fn with_chunker(&self, chunker: TextChunker) -> Self {
        Self {
            loader: self.loader.clone(),
            chunker,
        }
    }

    /// Load a PDF and split it into chunks
    pub fn prepare(&self, source_name: &str, data: &[u8]) -> Result<PreparedFile> {
        let pages = self.loader.load(source_name, data)?;
        let chunks = self.chunker.chunk(&pages);

        if chunks.is_empty() {
            return Err(Error::parse(source_name, "Document produced no text chunks"));
        }

        Ok(PreparedFile {
            source_name: source_name.to_string(),
            pages,
            chunks,
        })
    }
}
