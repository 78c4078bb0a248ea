//! Response types for ingestion and questions

use chrono::{DateTime, Utc};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::retrieval::ScoredChunk;

/// Warning shown when a question arrives before any successful ingestion
pub const NO_KNOWLEDGE_BASE_WARNING: &str = "Please upload documents to build the brain.";

/// Evidence shown under an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source filename
    pub source_name: String,
    /// Page on which the chunk starts
    pub page_number: u32,
    /// Exact chunk text
    pub text: String,
    /// Chunk text with query terms wrapped in <mark> tags
    pub text_highlighted: String,
    /// Cosine similarity to the question
    pub similarity: f32,
}

impl SourceRef {
    /// Create a source reference from a retrieved chunk
    pub fn from_scored(scored: &ScoredChunk) -> Self {
        Self {
            source_name: scored.chunk.source_name().to_string(),
            page_number: scored.chunk.page_number(),
            text: scored.chunk.text().to_string(),
            text_highlighted: scored.chunk.text().to_string(),
            similarity: scored.similarity,
        }
    }

    /// Highlight query terms in the chunk text
    ///
    /// All terms are matched in one pass over the original text, so a term
    /// never matches inside a tag added for another and repeats mark once.
    pub fn highlight_terms(&mut self, terms: &[&str]) {
        let mut seen = HashSet::new();
        let alternatives: Vec<String> = terms
            .iter()
            .map(|term| term.trim_matches(|c: char| !c.is_alphanumeric()))
            // Short words would mark half the text
            .filter(|term| term.chars().count() >= 3)
            .filter(|term| seen.insert(term.to_lowercase()))
            .map(regex::escape)
            .collect();

        if alternatives.is_empty() {
            self.text_highlighted = self.text.clone();
            return;
        }

        let pattern = format!(r"\b(?:{})\b", alternatives.join("|"));
        self.text_highlighted = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(re) => re.replace_all(&self.text, "<mark>$0</mark>").into_owned(),
            Err(e) => {
                tracing::debug!("Skipping highlight: {}", e);
                self.text.clone()
            }
        };
    }
}

/// Answer produced by the generator together with the evidence it was given
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    /// Generated answer
    pub answer: String,
    /// Chunks supplied to the model, in retrieval order
    pub sources: Vec<SourceRef>,
    /// Model that produced the answer
    pub model: String,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Result of asking a question
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AskOutcome {
    /// The question was answered from the knowledge base
    Answered(GeneratedAnswer),
    /// No knowledge base exists yet; nothing was queried
    NoKnowledgeBase {
        /// User-facing warning
        warning: String,
    },
}

impl AskOutcome {
    /// The empty-knowledge-base outcome
    pub fn no_knowledge_base() -> Self {
        Self::NoKnowledgeBase {
            warning: NO_KNOWLEDGE_BASE_WARNING.to_string(),
        }
    }

    /// Answer, if one was generated
    pub fn answer(&self) -> Option<&GeneratedAnswer> {
        match self {
            Self::Answered(answer) => Some(answer),
            Self::NoKnowledgeBase { .. } => None,
        }
    }
}

/// A file that made it into the knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedFile {
    /// Original filename
    pub source_name: String,
    /// SHA-256 of the uploaded bytes
    pub content_hash: String,
    /// Pages with extractable text
    pub pages: usize,
    /// Chunks created
    pub chunks: usize,
}

/// A file that could not be ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFailure {
    /// Original filename
    pub source_name: String,
    /// Error kind (parse_error, service_error, ...)
    pub kind: String,
    /// Error message
    pub message: String,
    /// Whether uploading again may succeed
    pub retryable: bool,
}

/// Outcome of an ingestion batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Whether the knowledge base was replaced
    pub knowledge_base_updated: bool,
    /// Files now in the knowledge base
    pub indexed: Vec<IndexedFile>,
    /// Files that failed
    pub failed: Vec<FileFailure>,
    /// Duplicate uploads processed once (filenames of the skipped copies)
    pub skipped: Vec<String>,
    /// Chunks in the new knowledge base
    pub total_chunks: usize,
    /// User-facing summary
    pub message: String,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Lifecycle state of the session's knowledge base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeState {
    /// No knowledge base yet
    Empty,
    /// A knowledge base is available for questions
    Ready,
}

/// Session summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Session identifier
    pub session_id: uuid::Uuid,
    /// Lifecycle state
    pub state: KnowledgeState,
    /// Chunks in the knowledge base
    pub chunk_count: usize,
    /// Source files in the knowledge base, in upload order
    pub sources: Vec<String>,
    /// When the knowledge base was last built
    pub updated_at: Option<DateTime<Utc>>,
}
