//! Server side of the tool-call contract.
//!
//! A tool server is any [`ToolHandler`] mounted with [`tool_router`]:
//!
//! - `POST /tool` - execute a [`ToolCall`]
//! - `GET /tools` - list exposed tools with their input schemas
//! - `GET /health` - liveness

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use relay_common::{ToolCall, ToolResult};
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Description of one tool, as listed by `GET /tools`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new<T: JsonSchema>(name: &'static str, description: &'static str) -> Self {
        let schema = schemars::schema_for!(T);
        Self {
            name,
            description,
            input_schema: serde_json::to_value(schema).unwrap_or(Value::Null),
        }
    }
}

/// A capability provider reachable through the tool-call contract.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name reported by `/health`.
    fn server_name(&self) -> &'static str;

    fn tools(&self) -> Vec<ToolDescriptor>;

    /// Execute a call for one of [`tools`](Self::tools). Every outcome,
    /// including bad parameters, is a [`ToolResult`].
    async fn handle(&self, call: ToolCall) -> ToolResult;
}

struct ServerState {
    handler: Arc<dyn ToolHandler>,
    start_time: Instant,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    server: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    tools: Vec<&'static str>,
}

/// Build the router for a tool server.
pub fn tool_router(handler: Arc<dyn ToolHandler>) -> Router {
    let state = Arc::new(ServerState {
        handler,
        start_time: Instant::now(),
    });

    Router::new()
        .route("/tool", post(call_tool))
        .route("/tools", get(list_tools))
        .route("/health", get(health))
        .with_state(state)
}

async fn call_tool(State(state): State<Arc<ServerState>>, Json(call): Json<ToolCall>) -> Response {
    info!(
        server = state.handler.server_name(),
        tool = %call.tool_name,
        task_id = call.task_id.as_deref().unwrap_or("-"),
        "Received tool call"
    );

    let known = state
        .handler
        .tools()
        .iter()
        .any(|t| t.name == call.tool_name);
    if !known {
        warn!(tool = %call.tool_name, "Unknown tool requested");
        let result = ToolResult::failure(
            "TOOL_NOT_FOUND",
            format!("Tool '{}' not found.", call.tool_name),
        );
        return (StatusCode::NOT_FOUND, Json(result)).into_response();
    }

    Json(state.handler.handle(call).await).into_response()
}

async fn list_tools(State(state): State<Arc<ServerState>>) -> Json<Vec<ToolDescriptor>> {
    Json(state.handler.tools())
}

async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        server: state.handler.server_name(),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        tools: state.handler.tools().iter().map(|t| t.name).collect(),
    })
}

/// Serve `router` on `addr` with request tracing.
pub async fn serve(router: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let router = router.layer(TraceLayer::new_for_http());

    info!(%addr, "Starting tool server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
