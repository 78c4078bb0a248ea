//! Session: the knowledge base for one user and the operations on it
//!
//! A session starts `Empty`. A successful ingestion builds a fresh index and
//! swaps it in whole, replacing whatever was there. Questions read the
//! current index without blocking ingestion.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::AnswerGenerator;
use crate::ingestion::{IngestPipeline, PdfLoader, PreparedFile, TextChunker};
use crate::providers::embedding::check_dimensions;
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::retrieval::VectorIndex;
use crate::types::{
    AskOutcome, FileFailure, IndexedFile, IngestOptions, IngestReport, KnowledgeState,
    SessionStatus, UploadedFile,
};

/// Knowledge base state
#[derive(Debug, Clone, Default)]
pub enum KnowledgeBase {
    /// Nothing ingested yet, or reset
    #[default]
    Empty,
    /// Index from the last successful ingestion
    Ready {
        index: Arc<VectorIndex>,
        updated_at: DateTime<Utc>,
    },
}

impl KnowledgeBase {
    pub fn state(&self) -> KnowledgeState {
        match self {
            KnowledgeBase::Empty => KnowledgeState::Empty,
            KnowledgeBase::Ready { .. } => KnowledgeState::Ready,
        }
    }
}

/// A file that went through load, chunk and embed
struct EmbeddedFile {
    content_hash: String,
    prepared: PreparedFile,
    vectors: Vec<Vec<f32>>,
}

/// One user's question-answering session
pub struct Session {
    id: Uuid,
    knowledge: RwLock<KnowledgeBase>,
    /// Serializes ingestions; questions never take it
    ingest_lock: Mutex<()>,
    pipeline: IngestPipeline,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: AnswerGenerator,
    top_k: usize,
    parallel_files: usize,
}

impl Session {
    /// Create a session with default retrieval settings
    pub fn new(
        pipeline: IngestPipeline,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: AnswerGenerator,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            knowledge: RwLock::new(KnowledgeBase::Empty),
            ingest_lock: Mutex::new(()),
            pipeline,
            embedder,
            generator,
            top_k: 4,
            parallel_files: 1,
        }
    }

    /// Create a session wired from configuration and ready-made providers
    pub fn from_config(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let mut loader =
            PdfLoader::new(std::time::Duration::from_secs(config.ingestion.pdf_timeout_secs));
        if let Some(dir) = &config.ingestion.temp_dir {
            loader = loader.with_temp_dir(dir);
        }
        let chunker = TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;

        Ok(Self::new(
            IngestPipeline::new(loader, chunker),
            embedder,
            AnswerGenerator::new(llm),
        )
        .with_top_k(config.retrieval.top_k)
        .with_parallel_files(config.ingestion.effective_parallel_files()))
    }

    /// Number of chunks retrieved per question
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Number of files loaded and embedded at once
    pub fn with_parallel_files(mut self, parallel_files: usize) -> Self {
        self.parallel_files = parallel_files.max(1);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn generator(&self) -> &AnswerGenerator {
        &self.generator
    }

    /// Snapshot of the current knowledge base
    pub fn knowledge(&self) -> KnowledgeBase {
        self.knowledge.read().clone()
    }

    /// Build a new knowledge base from `files`, replacing the current one
    ///
    /// Files are isolated: a corrupt PDF or a failed embedding marks that
    /// file as failed and the rest of the batch continues. When no file
    /// succeeds the current knowledge base is left untouched.
    pub async fn ingest(
        &self,
        files: Vec<UploadedFile>,
        options: IngestOptions,
    ) -> Result<IngestReport> {
        if files.is_empty() {
            return Err(Error::InvalidInput("No files uploaded".into()));
        }

        let pipeline = self.pipeline_for(&options)?;
        let _guard = self.ingest_lock.lock().await;
        let start = Instant::now();

        tracing::info!("Ingesting {} file(s)", files.len());

        let mut seen = HashSet::new();
        let mut skipped = Vec::new();
        let mut unique = Vec::with_capacity(files.len());
        for file in files {
            let hash = file.content_hash();
            if seen.insert(hash.clone()) {
                unique.push((hash, file));
            } else {
                tracing::warn!("Skipping duplicate upload: {}", file.name);
                skipped.push(file.name);
            }
        }

        let results: Vec<(String, Result<EmbeddedFile>)> = stream::iter(unique)
            .map(|(hash, file)| {
                let pipeline = pipeline.clone();
                async move {
                    let name = file.name.clone();
                    let result = self.process_file(pipeline, hash, file).await;
                    (name, result)
                }
            })
            .buffered(self.parallel_files)
            .collect()
            .await;

        let mut embedded = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in results {
            match result {
                Ok(file) => embedded.push(file),
                Err(e @ Error::Validation(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!("Failed to ingest {}: {}", name, e);
                    failed.push(FileFailure {
                        source_name: name,
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                        retryable: e.is_retryable(),
                    });
                }
            }
        }

        if embedded.is_empty() {
            tracing::warn!("No file could be ingested; knowledge base unchanged");
            return Ok(IngestReport {
                knowledge_base_updated: false,
                indexed: Vec::new(),
                failed,
                skipped,
                total_chunks: 0,
                message: "No documents could be indexed. Knowledge base unchanged.".to_string(),
                processing_time_ms: start.elapsed().as_millis() as u64,
            });
        }

        let mut indexed = Vec::with_capacity(embedded.len());
        let mut chunks = Vec::new();
        let mut vectors = Vec::new();
        for file in embedded {
            indexed.push(IndexedFile {
                source_name: file.prepared.source_name.clone(),
                content_hash: file.content_hash,
                pages: file.prepared.pages.len(),
                chunks: file.prepared.chunks.len(),
            });
            chunks.extend(file.prepared.chunks);
            vectors.extend(file.vectors);
        }

        let index = VectorIndex::build(chunks, vectors)?;
        let total_chunks = index.len();

        *self.knowledge.write() = KnowledgeBase::Ready {
            index: Arc::new(index),
            updated_at: Utc::now(),
        };

        let processing_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Brain updated: {} chunks from {} file(s) in {}ms ({} failed, {} skipped)",
            total_chunks,
            indexed.len(),
            processing_time_ms,
            failed.len(),
            skipped.len()
        );

        Ok(IngestReport {
            knowledge_base_updated: true,
            indexed,
            failed,
            skipped,
            total_chunks,
            message: format!("Brain Updated! {} chunks indexed.", total_chunks),
            processing_time_ms,
        })
    }

    /// Answer a question from the current knowledge base
    pub async fn ask(&self, question: &str) -> Result<AskOutcome> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("Question must not be empty".into()));
        }

        // Clone the Arc and drop the lock before any await
        let index = match &*self.knowledge.read() {
            KnowledgeBase::Empty => None,
            KnowledgeBase::Ready { index, .. } => Some(Arc::clone(index)),
        };
        let Some(index) = index else {
            tracing::info!("Question asked before any documents were ingested");
            return Ok(AskOutcome::no_knowledge_base());
        };

        tracing::info!("Question: \"{}\"", question);

        let query_vector = self.embedder.embed(question).await?;
        let retrieved = index.query(&query_vector, self.top_k)?;

        tracing::debug!(
            "Retrieved {} chunks (best similarity {:.3})",
            retrieved.len(),
            retrieved.first().map(|r| r.similarity).unwrap_or(0.0)
        );

        let answer = self.generator.generate(question, retrieved).await?;

        tracing::info!(
            "Answered in {}ms with {} sources",
            answer.processing_time_ms,
            answer.sources.len()
        );

        Ok(AskOutcome::Answered(answer))
    }

    /// Summary of the current knowledge base
    pub fn status(&self) -> SessionStatus {
        match &*self.knowledge.read() {
            KnowledgeBase::Empty => SessionStatus {
                session_id: self.id,
                state: KnowledgeState::Empty,
                chunk_count: 0,
                sources: Vec::new(),
                updated_at: None,
            },
            KnowledgeBase::Ready { index, updated_at } => SessionStatus {
                session_id: self.id,
                state: KnowledgeState::Ready,
                chunk_count: index.len(),
                sources: index.sources(),
                updated_at: Some(*updated_at),
            },
        }
    }

    /// Discard the knowledge base
    pub async fn reset(&self) {
        let _guard = self.ingest_lock.lock().await;
        *self.knowledge.write() = KnowledgeBase::Empty;
        tracing::info!("Knowledge base cleared");
    }

    fn pipeline_for(&self, options: &IngestOptions) -> Result<IngestPipeline> {
        if options.chunk_size.is_none() && options.chunk_overlap.is_none() {
            return Ok(self.pipeline.clone());
        }

        let current = self.pipeline.chunker();
        let chunk_size = options.chunk_size.unwrap_or(current.chunk_size());
        let overlap = options.chunk_overlap.unwrap_or(current.overlap());
        let chunker = TextChunker::new(chunk_size, overlap)
            .map_err(|_| Error::InvalidInput(format!(
                "Invalid chunking options: chunk_size={}, chunk_overlap={}",
                chunk_size, overlap
            )))?;

        Ok(self.pipeline.with_chunker(chunker))
    }

    async fn process_file(
        &self,
        pipeline: IngestPipeline,
        content_hash: String,
        file: UploadedFile,
    ) -> Result<EmbeddedFile> {
        tracing::info!("Processing file: {} ({} bytes)", file.name, file.data.len());

        let prepared = tokio::task::spawn_blocking(move || pipeline.prepare(&file.name, &file.data))
            .await
            .map_err(|e| Error::internal(format!("PDF task failed: {}", e)))??;

        tracing::debug!(
            "{}: {} pages, {} chunks",
            prepared.source_name,
            prepared.pages.len(),
            prepared.chunks.len()
        );

        let texts: Vec<String> = prepared
            .chunks
            .iter()
            .map(|c| c.text().to_string())
            .collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        if vectors.len() != texts.len() {
            return Err(Error::validation(format!(
                "{} returned {} embeddings for {} chunks",
                self.embedder.name(),
                vectors.len(),
                texts.len()
            )));
        }
        for vector in &vectors {
            check_dimensions(self.embedder.as_ref(), vector)?;
        }

        Ok(EmbeddedFile {
            content_hash,
            prepared,
            vectors,
        })
    }
}
