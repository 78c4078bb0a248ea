//! Prompt templates for grounded generation

use crate::retrieval::ScoredChunk;

/// Reply the model must give when the context does not contain the answer
pub const NOT_FOUND_ANSWER: &str = "I don't find that information in the internal documents.";

/// Prompt builder for grounded answers
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build context from retrieved chunks
    pub fn build_context(chunks: &[ScoredChunk]) -> String {
        let mut context = String::new();

        for (i, scored) in chunks.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {}, Page {}\n{}\n\n",
                i + 1,
                scored.chunk.source_name(),
                scored.chunk.page_number(),
                scored.chunk.text()
            ));
        }

        context.trim_end().to_string()
    }

    /// Build the grounded question-answering prompt
    pub fn build_grounded_prompt(question: &str, context: &str) -> String {
        format!(
            r#"You are a corporate assistant. Answer the question based ONLY on the provided context.
If the answer is not in the context, say "{not_found}"

<context>
{context}
</context>

Question: {question}"#,
            not_found = NOT_FOUND_ANSWER,
            context = context,
            question = question
        )
    }
}
