//! Delivery of `assign_task` messages to agents.

use async_trait::async_trait;
use relay_common::TaskMessage;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DispatchError {
    /// No answer within the dispatch timeout. The agent may still have the task.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Transport(String),

    #[error("agent answered HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl DispatchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Sends an assignment to an agent endpoint. One attempt, no retries.
#[async_trait]
pub trait AgentDispatcher: Send + Sync {
    async fn dispatch(&self, endpoint: &str, message: &TaskMessage) -> Result<(), DispatchError>;
}

pub struct HttpDispatcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpDispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl AgentDispatcher for HttpDispatcher {
    async fn dispatch(&self, endpoint: &str, message: &TaskMessage) -> Result<(), DispatchError> {
        debug!(endpoint = %endpoint, task_id = %message.task_id, "Dispatching assignment");

        let response = self
            .client
            .post(endpoint)
            .json(message)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DispatchError::Timeout(self.timeout)
                } else {
                    DispatchError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::post};
    use relay_common::AssignTask;
    use serde_json::Map;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/message", addr)
    }

    fn message() -> TaskMessage {
        TaskMessage::assign(
            "t-1",
            "task_manager_agent",
            "researcher_agent",
            AssignTask::new("research", Map::new()),
        )
    }

    #[tokio::test]
    async fn test_accepted() {
        let url = spawn(Router::new().route("/message", post(|| async { "{}" }))).await;
        HttpDispatcher::new(Duration::from_secs(1))
            .dispatch(&url, &message())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_slow_agent_is_timeout() {
        let url = spawn(Router::new().route(
            "/message",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "{}"
            }),
        ))
        .await;

        let err = HttpDispatcher::new(Duration::from_millis(100))
            .dispatch(&url, &message())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_non_2xx_is_rejected() {
        let url = spawn(Router::new().route(
            "/message",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "down") }),
        ))
        .await;

        let err = HttpDispatcher::new(Duration::from_secs(1))
            .dispatch(&url, &message())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Rejected { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        let err = HttpDispatcher::new(Duration::from_secs(1))
            .dispatch("http://127.0.0.1:1/message", &message())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Transport(_)));
    }
}
