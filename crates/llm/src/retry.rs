use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::{Completion, CompletionRequest, LlmClient};
use crate::error::LlmError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Exponential backoff for the given zero-based attempt, capped at
    /// `max_delay_ms`.
    pub fn delay_for(&self, attempt: u32) -> u64 {
        let base = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        (base as u64).min(self.max_delay_ms)
    }
}

/// Retries retryable provider errors with exponential backoff.
pub struct RetryingClient<T: LlmClient> {
    inner: T,
    config: RetryConfig,
}

impl<T: LlmClient> RetryingClient<T> {
    pub fn new(inner: T, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl<T: LlmClient> LlmClient for RetryingClient<T> {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let mut attempt = 0;
        loop {
            match self.inner.complete(request.clone()).await {
                Ok(completion) => return Ok(completion),
                Err(e) if attempt < self.config.max_retries && e.is_retryable() => {
                    let delay = e
                        .retry_after_ms()
                        .unwrap_or_else(|| self.config.delay_for(attempt))
                        .min(self.config.max_delay_ms);

                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay,
                        error = %e,
                        "Retrying LLM request"
                    );

                    tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn default_model(&self) -> &str {
        self.inner.default_model()
    }
}
