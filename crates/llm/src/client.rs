use async_trait::async_trait;
use relay_common::GenerateTextParams;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// A single-prompt completion request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system: Option<String>,
    /// Overrides the client's default model
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl From<&GenerateTextParams> for CompletionRequest {
    fn from(params: &GenerateTextParams) -> Self {
        Self {
            prompt: params.prompt.clone(),
            system: None,
            model: params.model.clone(),
            max_tokens: Some(params.max_tokens()),
            temperature: Some(params.temperature()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
    pub stop_reason: Option<String>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError>;

    /// Model used when a request does not name one.
    fn default_model(&self) -> &str;
}

#[async_trait]
impl LlmClient for Box<dyn LlmClient> {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        (**self).complete(request).await
    }

    fn default_model(&self) -> &str {
        (**self).default_model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_generate_text_applies_defaults() {
        let params = GenerateTextParams::new("Write about tides");
        let request = CompletionRequest::from(&params);
        assert_eq!(request.prompt, "Write about tides");
        assert_eq!(request.max_tokens, Some(5000));
        assert_eq!(request.temperature, Some(0.7));
        assert!(request.model.is_none());
    }

    #[test]
    fn test_request_from_generate_text_keeps_overrides() {
        let params = GenerateTextParams {
            prompt: "p".to_string(),
            model: Some("claude-3-haiku-20240307".to_string()),
            max_tokens: Some(200),
            temperature: Some(0.1),
        };
        let request = CompletionRequest::from(&params);
        assert_eq!(request.model.as_deref(), Some("claude-3-haiku-20240307"));
        assert_eq!(request.max_tokens, Some(200));
        assert_eq!(request.temperature, Some(0.1));
    }

    #[test]
    fn test_builder_helpers() {
        let request = CompletionRequest::new("hi")
            .with_temperature(0.1)
            .with_max_tokens(64);
        assert_eq!(request.temperature, Some(0.1));
        assert_eq!(request.max_tokens, Some(64));
        assert!(request.system.is_none());
    }
}
