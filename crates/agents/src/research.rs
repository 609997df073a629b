//! Research agent - searches the web and summarizes the findings.

use async_trait::async_trait;
use relay_common::{AssignTask, ErrorDetail, GenerateTextParams, Result, SearchWebParams, ToolParameters};
use relay_tools::ToolInvoker;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::agent::{Outcome, TaskAgent};
use crate::planning::{ToolPlan, output_str};

pub const AGENT_ID: &str = "researcher_agent";
pub const TASK_TYPE: &str = "research";

const SUMMARY_TEMPERATURE: f32 = 0.1;

pub struct ResearchAgent {
    tools: Arc<dyn ToolInvoker>,
    web_search_url: String,
    creative_llm_url: String,
}

impl ResearchAgent {
    pub fn new(
        tools: Arc<dyn ToolInvoker>,
        web_search_url: impl Into<String>,
        creative_llm_url: impl Into<String>,
    ) -> Self {
        Self {
            tools,
            web_search_url: web_search_url.into(),
            creative_llm_url: creative_llm_url.into(),
        }
    }

    fn build_plan(&self, topic: &str, language: Option<String>, max_words: Option<u64>) -> ToolPlan {
        let query = topic.to_string();
        let topic = topic.to_string();

        ToolPlan::new("research")
            .step(self.web_search_url.clone(), move |_| {
                Ok(ToolParameters::SearchWeb(SearchWebParams {
                    query: query.clone(),
                    num_results: None,
                }))
            })
            .step(self.creative_llm_url.clone(), move |prev| {
                let hits = prev
                    .and_then(|p| p.get("search_results"))
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let prompt = summary_prompt(&topic, hits, language.as_deref(), max_words);
                Ok(ToolParameters::GenerateText(GenerateTextParams {
                    prompt,
                    model: None,
                    max_tokens: None,
                    temperature: Some(SUMMARY_TEMPERATURE),
                }))
            })
    }
}

fn format_hits(hits: &[Value]) -> String {
    if hits.is_empty() {
        return "No results found.".to_string();
    }
    hits.iter()
        .map(|h| {
            let field = |k: &str| h.get(k).and_then(Value::as_str).unwrap_or("N/A").to_string();
            format!(
                "Title: {}\nURL: {}\nSnippet: {}\n---",
                field("title"),
                field("url"),
                field("snippet")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn summary_prompt(topic: &str, hits: &[Value], language: Option<&str>, max_words: Option<u64>) -> String {
    let mut prompt = format!(
        "You are a helpful research assistant. Summarize the key findings about \"{}\" \
         based only on the search results below.\n",
        topic
    );
    if let Some(language) = language {
        prompt.push_str(&format!("Write the summary in {}.\n", language));
    }
    if let Some(max_words) = max_words {
        prompt.push_str(&format!("Use at most {} words.\n", max_words));
    }
    prompt.push_str("Wrap the summary in <result></result> tags.\n\nSearch Results:\n");
    prompt.push_str(&format_hits(hits));
    prompt
}

/// Strip a `<result>...</result>` wrapper the model may add.
pub fn strip_result_tags(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("<result>") {
        s = rest;
    }
    if let Some(rest) = s.trim_end().strip_suffix("</result>") {
        s = rest;
    }
    s.trim()
}

/// `max_words` may arrive as a number or a numeric string.
fn max_words(assignment: &AssignTask) -> Option<u64> {
    match assignment.parameters.get("max_words")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn sources(output: Option<&Map<String, Value>>) -> Value {
    let urls = output
        .and_then(|o| o.get("search_results"))
        .and_then(Value::as_array)
        .map(|hits| {
            hits.iter()
                .filter_map(|h| h.get("url").and_then(Value::as_str))
                .map(|u| Value::String(u.to_string()))
                .collect()
        })
        .unwrap_or_default();
    Value::Array(urls)
}

#[async_trait]
impl TaskAgent for ResearchAgent {
    fn id(&self) -> &str {
        AGENT_ID
    }

    fn task_type(&self) -> &str {
        TASK_TYPE
    }

    fn required_parameters(&self) -> &[&'static str] {
        &["topic"]
    }

    async fn run(&self, task_id: &str, assignment: &AssignTask) -> Result<Outcome> {
        let topic = assignment.parameter_str("topic").unwrap_or_default();
        let language = assignment.parameter_str("language").map(str::to_string);
        let max_words = max_words(assignment);

        info!(task_id = %task_id, topic = %topic, language = ?language, "Researching topic");

        let run = self
            .build_plan(topic, language, max_words)
            .run(self.tools.as_ref(), Some(task_id))
            .await;

        if let Some(failure) = run.failure.clone() {
            return Ok(Outcome::Failed(failure));
        }

        let summary = output_str(run.final_output(), "generated_text")
            .map(strip_result_tags)
            .unwrap_or_default();
        if summary.is_empty() {
            return Ok(Outcome::Failed(ErrorDetail::new(
                "EMPTY_AGENT_OUTPUT",
                "Research finished, but the summary was empty.",
            )));
        }

        let mut result = Map::new();
        result.insert("summary".into(), Value::String(summary.to_string()));
        result.insert("sources".into(), sources(run.outputs.first()));
        result.insert("steps".into(), run.steps_value());
        Ok(Outcome::Completed(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use relay_common::{ToolCall, ToolResult};
    use serde_json::json;

    struct ScriptedTools {
        answers: Mutex<Vec<ToolResult>>,
        calls: Mutex<Vec<ToolCall>>,
    }

    #[async_trait]
    impl ToolInvoker for ScriptedTools {
        async fn invoke(&self, _server_url: &str, call: ToolCall) -> ToolResult {
            self.calls.lock().push(call);
            self.answers
                .lock()
                .pop()
                .unwrap_or_else(|| ToolResult::failure("EXHAUSTED", "no answer"))
        }
    }

    fn scripted(answers: Vec<ToolResult>) -> Arc<ScriptedTools> {
        Arc::new(ScriptedTools {
            answers: Mutex::new(answers.into_iter().rev().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn ok(v: Value) -> ToolResult {
        ToolResult::success(v.as_object().cloned().unwrap())
    }

    fn assignment(params: Value) -> AssignTask {
        AssignTask::new(TASK_TYPE, params.as_object().cloned().unwrap())
    }

    fn search_results() -> ToolResult {
        ok(json!({"search_results": [
            {"title": "Tides 101", "url": "https://a.example/tides", "snippet": "The moon"},
            {"title": "Ocean", "url": "https://b.example/ocean", "snippet": "Water"}
        ]}))
    }

    #[test]
    fn test_strips_result_wrapper() {
        assert_eq!(strip_result_tags("<result>\nTides rise.\n</result>"), "Tides rise.");
        assert_eq!(strip_result_tags("  plain  "), "plain");
    }

    #[test]
    fn test_max_words_accepts_numbers_and_strings() {
        assert_eq!(max_words(&assignment(json!({"max_words": 500}))), Some(500));
        assert_eq!(max_words(&assignment(json!({"max_words": "300"}))), Some(300));
        assert_eq!(max_words(&assignment(json!({"max_words": "lots"}))), None);
    }

    #[tokio::test]
    async fn test_summarizes_search_results() {
        let tools = scripted(vec![
            search_results(),
            ok(json!({"generated_text": "<result>Tides follow the moon.</result>"})),
        ]);
        let agent = ResearchAgent::new(tools.clone(), "http://search/tool", "http://llm/tool");

        let outcome = agent
            .run(
                "t-1",
                &assignment(json!({"topic": "tides", "language": "Turkish", "max_words": 500})),
            )
            .await
            .unwrap();

        let Outcome::Completed(result) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(result["summary"], "Tides follow the moon.");
        assert_eq!(result["sources"], json!(["https://a.example/tides", "https://b.example/ocean"]));

        let calls = tools.calls.lock();
        assert_eq!(calls[0].parameters["query"], "tides");
        let prompt = calls[1].parameters["prompt"].as_str().unwrap();
        assert!(prompt.contains("Turkish"));
        assert!(prompt.contains("500 words"));
        assert!(prompt.contains("https://a.example/tides"));
    }

    #[tokio::test]
    async fn test_search_failure_is_reported() {
        let tools = scripted(vec![ToolResult::failure("LLM_SEARCH_ERROR", "bad json")]);
        let agent = ResearchAgent::new(tools, "http://search/tool", "http://llm/tool");

        let outcome = agent.run("t-1", &assignment(json!({"topic": "tides"}))).await.unwrap();
        assert_eq!(outcome, Outcome::failed("LLM_SEARCH_ERROR", "bad json"));
    }

    #[tokio::test]
    async fn test_empty_summary_is_semantic_failure() {
        let tools = scripted(vec![
            search_results(),
            ok(json!({"generated_text": "<result></result>"})),
        ]);
        let agent = ResearchAgent::new(tools, "http://search/tool", "http://llm/tool");

        let outcome = agent.run("t-1", &assignment(json!({"topic": "tides"}))).await.unwrap();
        let Outcome::Failed(e) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(e.code.as_deref(), Some("EMPTY_AGENT_OUTPUT"));
    }
}
