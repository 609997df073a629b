pub mod anthropic;
pub mod client;
pub mod config;
pub mod error;
pub mod openai;
pub mod retry;

pub use anthropic::AnthropicClient;
pub use client::{Completion, CompletionRequest, LlmClient, TokenUsage};
pub use config::{LlmConfig, Provider, SemaphoredClient, build_llm_client};
pub use error::LlmError;
pub use openai::OpenAiClient;
pub use retry::{RetryConfig, RetryingClient};
