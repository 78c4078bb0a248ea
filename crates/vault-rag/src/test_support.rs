//! Shared fixtures for unit tests: in-memory PDFs, a local mock HTTP server
//! and deterministic provider doubles

use async_trait::async_trait;
use axum::Router;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::generation::NOT_FOUND_ANSWER;
use crate::providers::{EmbeddingProvider, LlmProvider};

/// Build a PDF with one page per entry, each page holding the given lines
pub fn pdf_with_pages(pages: &[&[&str]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in pages {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let y = 750 - 20 * i as i64;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![72.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn_mock_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Bag-of-words embedder: each lowercase word adds weight to a hashed bucket
pub struct KeywordEmbedder {
    dimensions: usize,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of texts embedded so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut vector = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let digest = Sha256::digest(word.to_lowercase().as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            vector[(u64::from_le_bytes(bucket) % self.dimensions as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Embedder whose backend is always down
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::service("embedding backend unavailable"))
    }

    fn dimensions(&self) -> usize {
        64
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Misbehaviour a `FaultyEmbedder` can be switched into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedFault {
    /// Behave like the wrapped keyword embedder
    None,
    /// Return one vector fewer than requested from `embed_batch`
    MissingVector,
    /// Return vectors one dimension too long
    WrongDimensions,
    /// Fail every call with a service error
    Outage,
}

/// Keyword embedder that can be switched into a fault after setup
pub struct FaultyEmbedder {
    inner: KeywordEmbedder,
    fault: Mutex<EmbedFault>,
}

impl FaultyEmbedder {
    pub fn new() -> Self {
        Self {
            inner: KeywordEmbedder::default(),
            fault: Mutex::new(EmbedFault::None),
        }
    }

    pub fn set_fault(&self, fault: EmbedFault) {
        *self.fault.lock() = fault;
    }

    fn fault(&self) -> EmbedFault {
        *self.fault.lock()
    }
}

impl Default for FaultyEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for FaultyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match self.fault() {
            EmbedFault::Outage => Err(Error::service("embedding backend unavailable")),
            EmbedFault::WrongDimensions => {
                let mut vector = self.inner.embed(text).await?;
                vector.push(0.0);
                Ok(vector)
            }
            EmbedFault::None | EmbedFault::MissingVector => self.inner.embed(text).await,
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        if self.fault() == EmbedFault::MissingVector {
            vectors.pop();
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.fault() != EmbedFault::Outage)
    }

    fn name(&self) -> &str {
        "faulty"
    }
}

/// Model whose backend is always down
pub struct FailingLlm;

#[async_trait]
impl LlmProvider for FailingLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(Error::service("generation backend unavailable"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "failing"
    }
}

/// Model that answers with the context it was given
pub struct EchoContextLlm;

#[async_trait]
impl LlmProvider for EchoContextLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let context = prompt
            .split_once("<context>")
            .and_then(|(_, rest)| rest.split_once("</context>"))
            .map(|(context, _)| context.trim().to_string())
            .unwrap_or_default();
        Ok(context)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "echo"
    }

    fn model(&self) -> &str {
        "echo"
    }
}

/// Model that counts calls and never finds the answer
#[derive(Default)]
pub struct CountingLlm {
    calls: AtomicUsize,
}

impl CountingLlm {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for CountingLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(NOT_FOUND_ANSWER.to_string())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "counting"
    }

    fn model(&self) -> &str {
        "counting"
    }
}
