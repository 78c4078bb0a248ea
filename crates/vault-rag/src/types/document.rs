//! Page and chunk types with source provenance

use serde::{Deserialize, Serialize};

/// Text of a single PDF page, tagged with the file it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Original upload filename
    pub source_name: String,
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Extracted, normalized page text
    pub text: String,
}

impl PageRecord {
    /// Create a page record
    pub fn new(source_name: impl Into<String>, page_number: u32, text: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            page_number,
            text: text.into(),
        }
    }
}

/// A bounded span of document text, the unit of retrieval.
///
/// Fields are private: a chunk never changes after the chunker emits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    text: String,
    source_name: String,
    page_number: u32,
    chunk_index: u32,
}

impl DocumentChunk {
    /// Create a chunk
    pub fn new(
        text: impl Into<String>,
        source_name: impl Into<String>,
        page_number: u32,
        chunk_index: u32,
    ) -> Self {
        Self {
            text: text.into(),
            source_name: source_name.into(),
            page_number,
            chunk_index,
        }
    }

    /// Chunk text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Original upload filename
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Page on which the chunk starts
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Position of the chunk within its document
    pub fn chunk_index(&self) -> u32 {
        self.chunk_index
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// An uploaded file waiting to be ingested
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original filename
    pub name: String,
    /// Raw file bytes
    pub data: bytes::Bytes,
}

impl UploadedFile {
    /// Create an upload
    pub fn new(name: impl Into<String>, data: impl Into<bytes::Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// SHA-256 of the file bytes, hex encoded
    pub fn content_hash(&self) -> String {
        use sha2::{Digest, Sha256};
        hex::encode(Sha256::digest(&self.data))
    }
}
