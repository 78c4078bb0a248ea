//! Core types for the pipeline

pub mod document;
pub mod query;
pub mod response;

pub use document::{DocumentChunk, PageRecord, UploadedFile};
pub use query::{AskRequest, IngestOptions};
pub use response::{
    AskOutcome, FileFailure, GeneratedAnswer, IndexedFile, IngestReport, KnowledgeState,
    SessionStatus, SourceRef, NO_KNOWLEDGE_BASE_WARNING,
};
