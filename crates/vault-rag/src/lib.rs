//! vault-rag: question answering over uploaded PDF documents
//!
//! Upload one or more PDFs, build an in-memory knowledge base (page-aware
//! chunks embedded with MiniLM), then ask questions. Answers come from a
//! hosted model instructed to use only the retrieved chunks, and every
//! answer carries the chunks it was given as sources.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod retry;
pub mod server;
pub mod session;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use session::{KnowledgeBase, Session};
pub use types::{
    document::{DocumentChunk, PageRecord, UploadedFile},
    query::{AskRequest, IngestOptions},
    response::{AskOutcome, GeneratedAnswer, IngestReport, SessionStatus, SourceRef},
};
