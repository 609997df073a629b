//! Client side of the tool-call contract.

use async_trait::async_trait;
use relay_common::{ToolCall, ToolParameters, ToolResult};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, error, info};

/// Failure code for transport errors, timeouts and non-2xx responses.
pub const MCP_CALL_FAILED: &str = "MCP_CALL_FAILED";
/// Failure code for a 2xx response whose body is not a `ToolResult`.
pub const UNEXPECTED_ERROR: &str = "UNEXPECTED_ERROR";

/// Something that can execute a [`ToolCall`] against a tool server.
///
/// Implementations never fail: every problem is reported as a `failure`
/// [`ToolResult`].
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, server_url: &str, call: ToolCall) -> ToolResult;
}

/// HTTP tool adapter. POSTs a [`ToolCall`] to a tool-server endpoint and
/// decodes the [`ToolResult`].
#[derive(Clone, Default)]
pub struct McpToolAdapter {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl McpToolAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every call by `timeout`. Unset by default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn call_tool(
        &self,
        server_url: &str,
        tool_name: &str,
        parameters: Map<String, Value>,
        task_id: Option<&str>,
    ) -> ToolResult {
        let call = ToolCall::new(tool_name, parameters, task_id.map(str::to_string));
        self.invoke(server_url, call).await
    }

    /// Typed variant of [`call_tool`](Self::call_tool).
    pub async fn call(
        &self,
        server_url: &str,
        parameters: ToolParameters,
        task_id: Option<&str>,
    ) -> ToolResult {
        let call = ToolCall::from_parameters(parameters, task_id.map(str::to_string));
        self.invoke(server_url, call).await
    }

    async fn send(&self, server_url: &str, call: &ToolCall) -> ToolResult {
        let mut request = self.client.post(server_url).json(call);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                return ToolResult::failure(
                    MCP_CALL_FAILED,
                    format!("Request to {} failed: {}", server_url, e),
                );
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return ToolResult::failure(
                MCP_CALL_FAILED,
                format!("{} returned HTTP {}: {}", server_url, status.as_u16(), body),
            );
        }

        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                return ToolResult::failure(
                    MCP_CALL_FAILED,
                    format!("Failed to read response from {}: {}", server_url, e),
                );
            }
        };

        serde_json::from_slice::<ToolResult>(&body).unwrap_or_else(|e| {
            ToolResult::failure(
                UNEXPECTED_ERROR,
                format!("Invalid tool result from {}: {}", server_url, e),
            )
        })
    }
}

#[async_trait]
impl ToolInvoker for McpToolAdapter {
    async fn invoke(&self, server_url: &str, call: ToolCall) -> ToolResult {
        info!(
            tool = %call.tool_name,
            server = %server_url,
            task_id = call.task_id.as_deref().unwrap_or("-"),
            "Calling tool"
        );
        debug!(parameters = ?call.parameters, "Tool parameters");

        let result = self.send(server_url, &call).await;

        match &result.error {
            Some(err) if !result.is_success() => error!(
                tool = %call.tool_name,
                server = %server_url,
                code = %err.code,
                message = %err.message,
                "Tool call failed"
            ),
            _ => info!(
                tool = %call.tool_name,
                status = ?result.status,
                "Tool call finished"
            ),
        }

        result
    }
}
