//! Integration tests for the coordinator HTTP surface.
//!
//! Most tests run the coordinator against small fake agents. The end-to-end
//! tests wire the real agent and tool servers together over HTTP.

use async_trait::async_trait;
use axum::{Json, Router, routing::post};
use relay_agents::{AgentState, ArticleDraftAgent, HttpResultReporter, TaskHandler};
use relay_api::{AppState, create_router};
use relay_coordinator::CoordinatorConfig;
use relay_llm::{Completion, CompletionRequest, LlmClient, LlmError};
use relay_tools::{
    BlobStore, CloudStorageServer, CreativeLlmServer, McpToolAdapter, ToolHandler, blob_routes,
    tool_router,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

fn run(listener: TcpListener, router: Router) {
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
}

fn config_for(agent_url: &str, timeout_ms: u64) -> CoordinatorConfig {
    CoordinatorConfig::default().with_overrides(|key| match key {
        "ARTICLE_DRAFT_AGENT_URL" | "RESEARCHER_AGENT_URL" => Some(agent_url.to_string()),
        "RELAY_DISPATCH_TIMEOUT_MS" => Some(timeout_ms.to_string()),
        _ => None,
    })
}

/// Spin up a coordinator whose agents live at `agent_url` and return its base URL.
async fn start_test_server(agent_url: &str, timeout_ms: u64) -> String {
    let (listener, base) = bind().await;
    let state = Arc::new(AppState::new(config_for(agent_url, timeout_ms)));
    run(listener, create_router(state));
    base
}

/// Fake agent that accepts every message.
async fn start_accepting_agent() -> String {
    let (listener, base) = bind().await;
    run(
        listener,
        Router::new().route(
            "/message",
            post(|| async { Json(serde_json::json!({"status": "processing"})) }),
        ),
    );
    format!("{}/message", base)
}

/// Helper to GET a URL and return (status, body).
async fn get(base: &str, path: &str) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .get(format!("{}{}", base, path))
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap_or(Value::Null))
}

/// Helper to POST JSON and return (status, body).
async fn post_json(base: &str, path: &str, json: &str) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}{}", base, path))
        .header("content-type", "application/json")
        .body(json.to_string())
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap_or(Value::Null))
}

async fn post_empty(base: &str, path: &str) -> (u16, Value) {
    post_json(base, path, "").await
}

fn result_body(task_id: &str, payload: &str) -> String {
    format!(
        r#"{{"task_id": "{}", "message_id": "m-1", "sender_id": "article_draft_agent",
            "receiver_id": "task_manager_agent", "message_type": "task_result", "payload": {}}}"#,
        task_id, payload
    )
}

// ============================================================================
// Health endpoint
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let agent = start_accepting_agent().await;
    let base = start_test_server(&agent, 1000).await;
    let (status, body) = get(&base, "/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["tasks"], 0);
}

// ============================================================================
// Trigger and status
// ============================================================================

#[tokio::test]
async fn test_trigger_then_poll_processing() {
    let agent = start_accepting_agent().await;
    let base = start_test_server(&agent, 1000).await;

    let (status, body) = post_empty(&base, "/tasks/trigger/article?topic=IoT%20Security").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "processing");
    let task_id = body["task_id"].as_str().unwrap().to_string();

    let (status, record) = get(&base, &format!("/tasks/{}/status", task_id)).await;
    assert_eq!(status, 200);
    assert_eq!(record["status"], "processing");
    assert!(record["result"].is_null());
    assert!(record["error"].is_null());
    assert!(record["question"].is_null());

    let (_, list) = get(&base, "/tasks").await;
    assert_eq!(list[0]["task_id"], task_id.as_str());
}

#[tokio::test]
async fn test_trigger_validation_errors() {
    let agent = start_accepting_agent().await;
    let base = start_test_server(&agent, 1000).await;

    let (status, body) = post_empty(&base, "/tasks/trigger/article").await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "MISSING_PARAMETER");

    let (status, body) = post_empty(&base, "/tasks/trigger/poem?topic=x").await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "UNKNOWN_TASK_KIND");

    let (_, health) = get(&base, "/health").await;
    assert_eq!(health["tasks"], 0);
}

#[tokio::test]
async fn test_unknown_task_is_404() {
    let agent = start_accepting_agent().await;
    let base = start_test_server(&agent, 1000).await;
    let (status, body) = get(&base, "/tasks/never-triggered/status").await;
    assert_eq!(status, 404);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_dispatch_failure_is_503_and_failed() {
    let base = start_test_server("http://127.0.0.1:1/message", 1000).await;

    let (status, body) = post_empty(&base, "/tasks/trigger/research?topic=tides").await;
    assert_eq!(status, 503);
    assert_eq!(body["status"], "failed");
    let task_id = body["task_id"].as_str().unwrap();
    assert!(
        body["detail"]
            .as_str()
            .unwrap()
            .starts_with("Failed to communicate with researcher_agent")
    );

    let (_, record) = get(&base, &format!("/tasks/{}/status", task_id)).await;
    assert_eq!(record["status"], "failed");
    assert_eq!(record["error"]["code"], "DISPATCH_FAILED");
}

#[tokio::test]
async fn test_dispatch_timeout_returns_processing() {
    let (listener, agent_base) = bind().await;
    run(
        listener,
        Router::new().route(
            "/message",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "{}"
            }),
        ),
    );
    let base = start_test_server(&format!("{}/message", agent_base), 100).await;

    let (status, body) = post_empty(&base, "/tasks/trigger/article?topic=IoT").await;
    assert_eq!(status, 200);
    let task_id = body["task_id"].as_str().unwrap();

    let (_, record) = get(&base, &format!("/tasks/{}/status", task_id)).await;
    assert_eq!(record["status"], "processing");
}

// ============================================================================
// Result ingestion
// ============================================================================

#[tokio::test]
async fn test_unknown_status_is_reported() {
    let agent = start_accepting_agent().await;
    let base = start_test_server(&agent, 1000).await;
    let (_, body) = post_empty(&base, "/tasks/trigger/article?topic=IoT").await;
    let task_id = body["task_id"].as_str().unwrap();

    let (status, ack) = post_json(&base, "/tasks/result", &result_body(task_id, r#"{"status": "paused"}"#)).await;
    assert_eq!(status, 200);
    assert_eq!(ack["status"], "ack");
    assert_eq!(ack["message_id"], "m-1");

    let (_, record) = get(&base, &format!("/tasks/{}/status", task_id)).await;
    assert_eq!(record["status"], "unknown");
    assert_eq!(record["error"]["message"], "Received unknown status: paused");
}

#[tokio::test]
async fn test_duplicate_result_does_not_revert() {
    let agent = start_accepting_agent().await;
    let base = start_test_server(&agent, 1000).await;
    let (_, body) = post_empty(&base, "/tasks/trigger/article?topic=IoT").await;
    let task_id = body["task_id"].as_str().unwrap();

    post_json(
        &base,
        "/tasks/result",
        &result_body(task_id, r#"{"status": "completed", "result": {"saved_url": "https://x/a.md"}}"#),
    )
    .await;
    let (_, ack) = post_json(
        &base,
        "/tasks/result",
        &result_body(task_id, r#"{"status": "failed", "error": {"message": "late"}}"#),
    )
    .await;
    assert!(ack["detail"].as_str().unwrap().starts_with("duplicate"));

    let (_, record) = get(&base, &format!("/tasks/{}/status", task_id)).await;
    assert_eq!(record["status"], "completed");
    assert_eq!(record["result"]["saved_url"], "https://x/a.md");
}

#[tokio::test]
async fn test_result_ack_errors() {
    let agent = start_accepting_agent().await;
    let base = start_test_server(&agent, 1000).await;

    let (status, ack) = post_json(&base, "/tasks/result", &result_body("", r#"{"status": "completed"}"#)).await;
    assert_eq!(status, 200);
    assert_eq!(ack["status"], "ack_error");

    let (_, ack) = post_json(&base, "/tasks/result", &result_body("t-9", r#"{"status": 7}"#)).await;
    assert_eq!(ack["status"], "ack_error");
    let (_, record) = get(&base, "/tasks/t-9/status").await;
    assert_eq!(record["error"]["code"], "INVALID_RESULT_PAYLOAD");

    let (_, ack) = post_json(
        &base,
        "/tasks/result",
        r#"{"task_id": "t-10", "message_type": "cancel_task", "payload": {}}"#,
    )
    .await;
    assert_eq!(ack["status"], "error");
}

#[tokio::test]
async fn test_legacy_agent_result_lands() {
    let agent = start_accepting_agent().await;
    let base = start_test_server(&agent, 1000).await;
    let (_, body) = post_empty(&base, "/tasks/trigger/research?topic=tides").await;
    let task_id = body["task_id"].as_str().unwrap();

    let legacy = format!(
        r#"{{"task_id": "{}", "message_id": "m-7", "sender_agent_id": "researcher_agent",
            "receiver_agent_id": "task_manager_agent", "timestamp": "2024-05-01T12:00:00.123456",
            "message_type": "task_result", "payload": {{"status": "completed", "result": {{"summary": "ok"}}}}}}"#,
        task_id
    );
    let (status, ack) = post_json(&base, "/tasks/result", &legacy).await;
    assert_eq!(status, 200);
    assert_eq!(ack["status"], "ack");

    let (_, record) = get(&base, &format!("/tasks/{}/status", task_id)).await;
    assert_eq!(record["status"], "completed");
    assert_eq!(record["result"]["summary"], "ok");
}

#[tokio::test]
async fn test_null_task_id_is_ack_error() {
    let agent = start_accepting_agent().await;
    let base = start_test_server(&agent, 1000).await;

    let (status, ack) = post_json(
        &base,
        "/tasks/result",
        r#"{"task_id": null, "message_id": "m-8", "message_type": "task_result", "payload": {"status": "completed"}}"#,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(ack["status"], "ack_error");
}

// ============================================================================
// End to end
// ============================================================================

struct CannedLlm;

#[async_trait]
impl LlmClient for CannedLlm {
    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, LlmError> {
        Ok(Completion {
            text: "# IoT Security\n\nDraft body.".into(),
            model: "canned".into(),
            usage: None,
            stop_reason: None,
        })
    }

    fn default_model(&self) -> &str {
        "canned"
    }
}

/// Coordinator, article agent, creative and storage tool servers, all over HTTP.
async fn start_stack(buckets: &[&str]) -> String {
    let (coord_listener, coord_base) = bind().await;
    let (agent_listener, agent_base) = bind().await;

    let (creative_listener, creative_base) = bind().await;
    let creative: Arc<dyn ToolHandler> =
        Arc::new(CreativeLlmServer::new(Some(Arc::new(CannedLlm) as Arc<dyn LlmClient>)));
    run(creative_listener, tool_router(creative));

    let (storage_listener, storage_base) = bind().await;
    let store = Arc::new(BlobStore::with_buckets(buckets.iter().copied()));
    let storage: Arc<dyn ToolHandler> = Arc::new(CloudStorageServer::new(
        store.clone(),
        format!("{}/blobs", storage_base),
    ));
    run(storage_listener, tool_router(storage).merge(blob_routes(store)));

    let agent = ArticleDraftAgent::new(
        Arc::new(McpToolAdapter::new()),
        format!("{}/tool", creative_base),
        format!("{}/tool", storage_base),
        Some("articles".into()),
    );
    let reporter = Arc::new(HttpResultReporter::new(format!("{}/tasks/result", coord_base)));
    let agent_state = Arc::new(AgentState::new(TaskHandler::new(Arc::new(agent), reporter)));
    run(agent_listener, relay_agents::create_router(agent_state));

    let state = Arc::new(AppState::new(config_for(&format!("{}/message", agent_base), 2000)));
    run(coord_listener, create_router(state));

    coord_base
}

async fn poll_until_settled(base: &str, task_id: &str) -> Value {
    for _ in 0..100 {
        let (_, record) = get(base, &format!("/tasks/{}/status", task_id)).await;
        if record["status"] != "processing" {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("task {} never settled", task_id);
}

#[tokio::test]
async fn test_article_end_to_end_completes() {
    let base = start_stack(&["articles"]).await;

    let (status, body) = post_empty(&base, "/tasks/trigger/article?topic=IoT%20Security").await;
    assert_eq!(status, 200);
    let task_id = body["task_id"].as_str().unwrap();

    let record = poll_until_settled(&base, task_id).await;
    assert_eq!(record["status"], "completed");
    let url = record["result"]["saved_url"].as_str().unwrap();
    assert!(url.contains("/blobs/articles/iot_security-"));

    let content = reqwest::get(url).await.unwrap().text().await.unwrap();
    assert!(content.contains("Draft body."));
}

#[tokio::test]
async fn test_article_end_to_end_missing_bucket_fails() {
    let base = start_stack(&["elsewhere"]).await;

    let (_, body) = post_empty(&base, "/tasks/trigger/article?topic=IoT").await;
    let task_id = body["task_id"].as_str().unwrap();

    let record = poll_until_settled(&base, task_id).await;
    assert_eq!(record["status"], "failed");
    assert_eq!(record["error"]["code"], "BUCKET_NOT_FOUND");
    assert!(record["result"].is_null());
}
