//! Grounded answer generation

pub mod groq;
pub mod prompt;

pub use groq::GroqClient;
pub use prompt::{PromptBuilder, NOT_FOUND_ANSWER};

use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::providers::LlmProvider;
use crate::retrieval::ScoredChunk;
use crate::types::{GeneratedAnswer, SourceRef};

/// Turns a question and its retrieved chunks into an answer with sources
#[derive(Clone)]
pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// The underlying model provider
    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Generate an answer from exactly the retrieved chunks
    ///
    /// The returned sources are the chunks supplied to the model, in
    /// retrieval order.
    pub async fn generate(
        &self,
        question: &str,
        retrieved: Vec<ScoredChunk>,
    ) -> Result<GeneratedAnswer> {
        let start = Instant::now();

        let context = PromptBuilder::build_context(&retrieved);
        let prompt = PromptBuilder::build_grounded_prompt(question, &context);

        tracing::debug!(
            "Prompt built from {} chunks ({} chars)",
            retrieved.len(),
            prompt.len()
        );

        let answer = self.llm.complete(&prompt).await?;

        let terms: Vec<&str> = question.split_whitespace().collect();
        let sources = retrieved
            .iter()
            .map(|scored| {
                let mut source = SourceRef::from_scored(scored);
                source.highlight_terms(&terms);
                source
            })
            .collect();

        Ok(GeneratedAnswer {
            answer,
            sources,
            model: self.llm.model().to_string(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
