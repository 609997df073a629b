use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::anthropic::AnthropicClient;
use crate::client::{Completion, CompletionRequest, LlmClient};
use crate::error::LlmError;
use crate::openai::OpenAiClient;
use crate::retry::{RetryConfig, RetryingClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: Provider,
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_max_concurrent() -> usize {
    4
}

impl LlmConfig {
    pub fn new(provider: Provider, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key,
            api_url: None,
            max_concurrent_requests: default_max_concurrent(),
            retry: RetryConfig::default(),
        }
    }

    /// Pick a provider from `ANTHROPIC_API_KEY` or `OPENAI_API_KEY`, in that
    /// order. Returns `None` when neither key is set.
    pub fn from_env(anthropic_model: &str, openai_model: &str) -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), anthropic_model, openai_model)
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        anthropic_model: &str,
        openai_model: &str,
    ) -> Option<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("ANTHROPIC_API_KEY") {
            return Some(Self::new(Provider::Anthropic, anthropic_model, Some(key)));
        }
        non_empty("OPENAI_API_KEY").map(|key| Self::new(Provider::OpenAi, openai_model, Some(key)))
    }
}

/// Caps the number of in-flight requests to the wrapped client.
pub struct SemaphoredClient {
    inner: Arc<dyn LlmClient>,
    semaphore: Arc<tokio::sync::Semaphore>,
}

impl SemaphoredClient {
    pub fn new(inner: Arc<dyn LlmClient>, max_concurrent: usize) -> Self {
        Self {
            inner,
            semaphore: Arc::new(tokio::sync::Semaphore::new(max_concurrent.max(1))),
        }
    }
}

#[async_trait]
impl LlmClient for SemaphoredClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| LlmError::Config(format!("Semaphore closed: {e}")))?;
        self.inner.complete(request).await
    }

    fn default_model(&self) -> &str {
        self.inner.default_model()
    }
}

pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let base_client: Box<dyn LlmClient> = match config.provider {
        Provider::OpenAi => Box::new(OpenAiClient::new(
            config.api_url.clone(),
            config.model.clone(),
            config.api_key.clone(),
        )),
        Provider::Anthropic => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| LlmError::Config("Anthropic requires an API key".to_string()))?;
            let client = AnthropicClient::new(config.model.clone(), api_key);
            match &config.api_url {
                Some(url) => Box::new(client.with_api_url(url.clone())),
                None => Box::new(client),
            }
        }
    };

    let retrying: Box<dyn LlmClient> =
        Box::new(RetryingClient::new(base_client, config.retry.clone()));

    Ok(Arc::new(SemaphoredClient::new(
        Arc::from(retrying),
        config.max_concurrent_requests,
    )))
}
