//! Web-search tool server backed by an LLM that simulates a search engine.

use async_trait::async_trait;
use relay_common::tool::SEARCH_WEB;
use relay_common::{SearchWebParams, ToolCall, ToolResult};
use relay_llm::{CompletionRequest, LlmClient};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::server::{ToolDescriptor, ToolHandler};

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// One simulated search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

pub struct WebSearchServer {
    llm: Option<Arc<dyn LlmClient>>,
}

impl WebSearchServer {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }

    pub async fn handle_search(&self, params: SearchWebParams) -> ToolResult {
        let Some(llm) = &self.llm else {
            return ToolResult::failure(
                "LLM_NOT_INITIALIZED",
                "Web search server has no LLM configured. Check ANTHROPIC_API_KEY or OPENAI_API_KEY.",
            );
        };

        let num_results = params.num_results();
        info!(query = %params.query, num_results, "Simulating web search");

        let request = CompletionRequest::new(search_prompt(&params.query, num_results))
            .with_temperature(0.1)
            .with_max_tokens(2048);

        let hits = match llm.complete(request).await {
            Ok(completion) => parse_hits(&completion.text),
            Err(e) => Err(e.to_string()),
        };

        match hits {
            Ok(hits) => {
                info!(count = hits.len(), "Simulated search succeeded");
                let mut result = Map::new();
                result.insert(
                    "search_results".into(),
                    serde_json::to_value(hits).unwrap_or(Value::Array(Vec::new())),
                );
                ToolResult::success(result)
            }
            Err(e) => {
                error!(error = %e, "Simulated search failed");
                ToolResult::failure("LLM_SEARCH_ERROR", format!("Simulated search failed: {}", e))
            }
        }
    }
}

fn search_prompt(query: &str, num_results: u32) -> String {
    format!(
        "You are a simulated web search engine. When given a search query, provide a list of \
         relevant, but fake, search results.\n\
         Provide exactly {num_results} results. Each result should be a JSON object with the \
         following keys: \"title\", \"url\", \"snippet\".\n\
         Ensure the URL is a valid-looking URL (starting with http:// or https://).\n\
         Respond only with the JSON list, nothing else.\n\n\
         Search Query: {query}\n\nJSON Results:"
    )
}

/// Parse the model output as a JSON list of hits, tolerating a fenced
/// code block around it.
pub fn parse_hits(raw: &str) -> Result<Vec<SearchHit>, String> {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    serde_json::from_str::<Vec<SearchHit>>(text.trim())
        .map_err(|e| format!("LLM did not return a valid JSON list of objects: {}", e))
}

#[async_trait]
impl ToolHandler for WebSearchServer {
    fn server_name(&self) -> &'static str {
        "web-search"
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new::<SearchWebParams>(
            SEARCH_WEB,
            "Search the web and return titles, URLs and snippets",
        )]
    }

    async fn handle(&self, call: ToolCall) -> ToolResult {
        let query = call
            .parameters
            .get("query")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if query.is_empty() {
            warn!("Search request without a query");
            return ToolResult::failure("MISSING_PARAMETER", "Search query is missing.");
        }

        match serde_json::from_value::<SearchWebParams>(Value::Object(call.parameters.clone())) {
            Ok(params) => self.handle_search(params).await,
            Err(e) => ToolResult::failure(
                "INVALID_PARAMETERS",
                format!("Invalid parameters for search_web: {}", e),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_llm::{Completion, LlmError};
    use serde_json::json;

    struct CannedClient(&'static str);

    #[async_trait]
    impl LlmClient for CannedClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<Completion, LlmError> {
            Ok(Completion {
                text: self.0.to_string(),
                model: "canned".to_string(),
                usage: None,
                stop_reason: None,
            })
        }

        fn default_model(&self) -> &str {
            "canned"
        }
    }

    fn call(params: Value) -> ToolCall {
        ToolCall::new(SEARCH_WEB, params.as_object().cloned().unwrap(), None)
    }

    #[test]
    fn test_parses_fenced_json() {
        let raw = "```json\n[{\"title\": \"A\", \"url\": \"https://a.example\", \"snippet\": \"s\"}]\n```";
        let hits = parse_hits(raw).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://a.example");
    }

    #[test]
    fn test_rejects_non_list() {
        assert!(parse_hits("{\"title\": \"A\"}").is_err());
        assert!(parse_hits("no results today").is_err());
    }

    #[tokio::test]
    async fn test_search_returns_results() {
        let server = WebSearchServer::new(Some(Arc::new(CannedClient(
            r#"[{"title": "Tides", "url": "https://tides.example", "snippet": "Moon"}]"#,
        ))));
        let result = server.handle(call(json!({"query": "tides"}))).await;
        assert!(result.is_success());
        let hits = &result.result.unwrap()["search_results"];
        assert_eq!(hits[0]["title"], "Tides");
    }

    #[tokio::test]
    async fn test_unparseable_output_is_search_error() {
        let server = WebSearchServer::new(Some(Arc::new(CannedClient("sorry"))));
        let result = server.handle(call(json!({"query": "tides"}))).await;
        assert_eq!(result.error.unwrap().code, "LLM_SEARCH_ERROR");
    }

    #[tokio::test]
    async fn test_missing_query_is_reported() {
        let server = WebSearchServer::new(Some(Arc::new(CannedClient("[]"))));
        let result = server.handle(call(json!({"num_results": 2}))).await;
        assert_eq!(result.error.unwrap().code, "MISSING_PARAMETER");
    }
}
