//! Creative-LLM tool server: `generate_text`.

use async_trait::async_trait;
use relay_common::tool::GENERATE_TEXT;
use relay_common::{GenerateTextParams, ToolCall, ToolParameters, ToolResult};
use relay_llm::{CompletionRequest, LlmClient};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::server::{ToolDescriptor, ToolHandler};

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

pub struct CreativeLlmServer {
    llm: Option<Arc<dyn LlmClient>>,
}

impl CreativeLlmServer {
    /// `llm` is `None` when no provider could be configured; calls then fail
    /// with `LLM_NOT_INITIALIZED`.
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }

    pub async fn handle_generate_text(&self, params: GenerateTextParams) -> ToolResult {
        let Some(llm) = &self.llm else {
            error!("generate_text called but no LLM is configured");
            return ToolResult::failure(
                "LLM_NOT_INITIALIZED",
                "Creative LLM server has no LLM configured. Check ANTHROPIC_API_KEY or OPENAI_API_KEY.",
            );
        };

        info!(
            prompt_preview = %params.prompt.chars().take(80).collect::<String>(),
            max_tokens = params.max_tokens(),
            "Generating text"
        );

        match llm.complete(CompletionRequest::from(&params)).await {
            Ok(completion) => {
                let mut result = Map::new();
                result.insert("generated_text".into(), Value::String(completion.text));
                result.insert("model".into(), Value::String(completion.model));
                ToolResult::success(result)
            }
            Err(e) => {
                error!(error = %e, "Text generation failed");
                ToolResult::failure("LLM_GENERATION_ERROR", format!("Text generation failed: {}", e))
            }
        }
    }
}

#[async_trait]
impl ToolHandler for CreativeLlmServer {
    fn server_name(&self) -> &'static str {
        "creative-llm"
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new::<GenerateTextParams>(
            GENERATE_TEXT,
            "Generate text from a prompt with a large language model",
        )]
    }

    async fn handle(&self, call: ToolCall) -> ToolResult {
        match call.parameters() {
            Ok(ToolParameters::GenerateText(params)) => self.handle_generate_text(params).await,
            Ok(other) => ToolResult::failure(
                "TOOL_NOT_FOUND",
                format!("Tool '{}' not found.", other.tool_name()),
            ),
            Err(e) => {
                warn!(error = %e, "Invalid generate_text parameters");
                ToolResult::failure(e.code, e.message)
            }
        }
    }
}
