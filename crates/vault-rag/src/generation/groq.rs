//! Groq client (OpenAI-compatible chat completions) with retry logic

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::providers::LlmProvider;
use crate::retry::{Failure, RetryPolicy};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Hosted generation client
pub struct GroqClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    retry: RetryPolicy,
}

impl GroqClient {
    /// Create a client from configuration; the credential may be absent,
    /// in which case every completion fails with a service error
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model_name.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            Error::service(format!(
                "No API credential configured for {} (set {})",
                self.model,
                crate::config::API_KEY_VAR
            ))
        })
    }

    async fn request_completion(
        &self,
        api_key: &str,
        prompt: &str,
    ) -> std::result::Result<String, Failure> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                Failure::Transient(if e.is_timeout() {
                    Error::service(format!("Generation request timed out: {}", e))
                } else {
                    Error::service(format!("Generation request failed: {}", e))
                })
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Failure::from_status(
                status,
                Error::service(format!("Generation failed: HTTP {} - {}", status, body)),
            ));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            Failure::Transient(Error::service(format!(
                "Failed to parse generation response: {}",
                e
            )))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                Failure::Permanent(Error::service("Generation returned an empty completion"))
            })
    }
}

#[async_trait]
impl LlmProvider for GroqClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self.api_key()?;

        tracing::info!("Generating answer with model: {}", self.model);

        self.retry
            .run("Generation request", move || {
                self.request_completion(api_key, prompt)
            })
            .await
    }

    async fn health_check(&self) -> Result<bool> {
        let Ok(api_key) = self.api_key() else {
            return Ok(false);
        };
        let url = format!("{}/models", self.base_url);
        match self.client.get(&url).bearer_auth(api_key).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "groq"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_mock_server;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn client_for(base_url: String, api_key: Option<&str>) -> GroqClient {
        let config = LlmConfig {
            base_url,
            api_key: api_key.map(str::to_string),
            ..LlmConfig::default()
        };
        GroqClient::new(&config)
            .unwrap()
            .with_retry(RetryPolicy::immediate(0))
    }

    #[tokio::test]
    async fn test_complete_sends_prompt_and_reads_choice() {
        let router = Router::new().route(
            "/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Bearer gsk_test");
                assert_eq!(body["model"], "llama-3.3-70b-versatile");
                assert_eq!(body["messages"][0]["role"], "user");
                assert_eq!(body["messages"][0]["content"], "prompt text");
                Json(json!({
                    "choices": [{ "message": { "role": "assistant", "content": " 30 days. " } }]
                }))
            }),
        );
        let base_url = spawn_mock_server(router).await;

        let answer = client_for(base_url, Some("gsk_test"))
            .complete("prompt text")
            .await
            .unwrap();
        assert_eq!(answer, "30 days.");
    }

    #[tokio::test]
    async fn test_http_error_is_service_error() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded") }),
        );
        let base_url = spawn_mock_server(router).await;

        let err = client_for(base_url, Some("gsk_test"))
            .complete("prompt")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("upstream exploded"));
    }

    #[tokio::test]
    async fn test_rejected_request_is_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let hits = counter.clone();
        let router = Router::new().route(
            "/chat/completions",
            post(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::UNAUTHORIZED, "invalid api key")
                }
            }),
        );
        let base_url = spawn_mock_server(router).await;

        let err = client_for(base_url, Some("gsk_bad"))
            .with_retry(RetryPolicy::immediate(3))
            .complete("prompt")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let hits = counter.clone();
        let router = Router::new().route(
            "/chat/completions",
            post(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::BAD_GATEWAY, "try later")
                }
            }),
        );
        let base_url = spawn_mock_server(router).await;

        let err = client_for(base_url, Some("gsk_test"))
            .with_retry(RetryPolicy::immediate(2))
            .complete("prompt")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_choices_is_service_error() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({ "choices": [] })) }),
        );
        let base_url = spawn_mock_server(router).await;

        let err = client_for(base_url, Some("gsk_test"))
            .complete("prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Service(_)));
    }

    #[tokio::test]
    async fn test_missing_credential_fails_without_request() {
        let client = client_for("http://127.0.0.1:9".to_string(), None);
        let err = client.complete("prompt").await.unwrap_err();

        assert!(matches!(err, Error::Service(ref m) if m.contains("GROQ_API_KEY")));
        assert!(!client.health_check().await.unwrap());
    }
}
