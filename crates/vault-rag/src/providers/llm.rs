//! LLM provider trait for the hosted generation model

use async_trait::async_trait;

use crate::error::Result;

/// Trait for text completion against a hosted model
///
/// Implementations:
/// - `GroqClient`: Groq (OpenAI-compatible chat completions)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a fully built prompt
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is reachable and the credential is accepted
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model being used
    fn model(&self) -> &str;
}
