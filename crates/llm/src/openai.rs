use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::{Completion, CompletionRequest, LlmClient, TokenUsage};
use crate::error::{LlmError, status_error};

const PROVIDER: &str = "OpenAI";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: String,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Client for any OpenAI-compatible chat completions endpoint.
pub struct OpenAiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(base_url: Option<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.into(),
            api_key,
            http_client: reqwest::Client::new(),
        }
    }

    fn build_body(&self, request: CompletionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: Some(system),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: Some(request.prompt),
        });

        ChatRequest {
            model: request.model.unwrap_or_else(|| self.model.clone()),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let body = self.build_body(request);

        let mut http_req = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&body);
        if let Some(ref key) = self.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let response = http_req.send().await.map_err(|e| LlmError::Transport {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| LlmError::Decode {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::Empty(PROVIDER))?;
        let text = choice
            .message
            .content
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::Empty(PROVIDER))?;

        Ok(Completion {
            text,
            model: parsed.model,
            usage: parsed.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
            stop_reason: choice.finish_reason,
        })
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}
