//! Retry with exponential backoff for calls to hosted backends

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{Error, Result};

/// Backoff doubles up to this many times, then stays flat
const MAX_BACKOFF_DOUBLINGS: u32 = 16;

/// A failed attempt, tagged with whether repeating it can help
#[derive(Debug)]
pub enum Failure {
    /// Transport error, timeout, 5xx, 408 or 429
    Transient(Error),
    /// The backend rejected the request; a retry would be rejected too
    Permanent(Error),
}

impl Failure {
    /// Classify an error response by its HTTP status
    pub fn from_status(status: StatusCode, error: Error) -> Self {
        if status.is_server_error()
            || status == StatusCode::TOO_MANY_REQUESTS
            || status == StatusCode::REQUEST_TIMEOUT
        {
            Failure::Transient(error)
        } else {
            Failure::Permanent(error)
        }
    }
}

/// How often and how patiently to retry a failing request
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Policy with a one second base delay
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Policy that never waits between attempts
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt + 1`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.min(MAX_BACKOFF_DOUBLINGS))
    }

    /// Run `operation` until it succeeds, fails permanently, or retries are
    /// exhausted
    pub async fn run<F, Fut, T>(&self, label: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, Failure>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(Failure::Permanent(e)) => {
                    tracing::warn!("{} rejected, not retrying: {}", label, e);
                    return Err(e);
                }
                Err(Failure::Transient(e)) => {
                    if attempt < self.max_retries {
                        let delay = self.delay_for(attempt);
                        tracing::warn!(
                            "{} failed (attempt {}/{}): {}; retrying in {:?}",
                            label,
                            attempt + 1,
                            self.max_retries.saturating_add(1),
                            e,
                            delay
                        );
                        sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::service(format!("{} failed", label))))
    }
}
