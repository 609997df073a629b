use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::{Completion, CompletionRequest, LlmClient, TokenUsage};
use crate::error::{LlmError, status_error};

const PROVIDER: &str = "Anthropic";
const DEFAULT_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    usage: Option<Usage>,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    api_url: String,
    model: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: model.into(),
            api_key: api_key.into(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Point the client at a different API root (proxies, local mocks).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_body(&self, request: CompletionRequest) -> MessagesRequest {
        MessagesRequest {
            model: request.model.unwrap_or_else(|| self.model.clone()),
            messages: vec![Message {
                role: "user",
                content: request.prompt,
            }],
            system: request.system,
            temperature: request.temperature,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let body = self.build_body(request);

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.api_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| LlmError::Decode {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect::<String>();

        if text.is_empty() {
            return Err(LlmError::Empty(PROVIDER));
        }

        Ok(Completion {
            text,
            model: parsed.model,
            usage: parsed.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
            stop_reason: parsed.stop_reason,
        })
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}
