//! Delivery of task results to the coordinator.

use async_trait::async_trait;
use relay_common::{RelayError, Result, TaskMessage};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_RESULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends `task_result` messages to the coordinator. One attempt per message.
#[async_trait]
pub trait ResultReporter: Send + Sync {
    async fn report(&self, message: TaskMessage) -> Result<()>;
}

pub struct HttpResultReporter {
    client: reqwest::Client,
    result_url: String,
    timeout: Duration,
}

impl HttpResultReporter {
    pub fn new(result_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            result_url: result_url.into(),
            timeout: DEFAULT_RESULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ResultReporter for HttpResultReporter {
    async fn report(&self, message: TaskMessage) -> Result<()> {
        debug!(
            task_id = %message.task_id,
            message_id = %message.message_id,
            url = %self.result_url,
            "Sending task result"
        );

        let response = self
            .client
            .post(&self.result_url)
            .json(&message)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RelayError::Agent(format!("Failed to send result: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Agent(format!(
                "Coordinator rejected result with HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        info!(task_id = %message.task_id, "Task result delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use parking_lot::Mutex;
    use relay_common::TaskResultPayload;
    use serde_json::Map;
    use std::sync::Arc;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/tasks/result", addr)
    }

    fn message() -> TaskMessage {
        TaskMessage::result(
            "t-1",
            "researcher_agent",
            "task_manager_agent",
            TaskResultPayload::completed(Map::new()),
        )
    }

    #[tokio::test]
    async fn test_posts_message_as_json() {
        let received = Arc::new(Mutex::new(Vec::<TaskMessage>::new()));
        let sink = received.clone();
        let url = spawn(Router::new().route(
            "/tasks/result",
            post(move |Json(m): Json<TaskMessage>| {
                let sink = sink.clone();
                async move {
                    sink.lock().push(m);
                    Json(serde_json::json!({"status": "ack"}))
                }
            }),
        ))
        .await;

        HttpResultReporter::new(url).report(message()).await.unwrap();
        let received = received.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].task_id, "t-1");
    }

    #[tokio::test]
    async fn test_non_2xx_is_an_error() {
        let url = spawn(Router::new().route(
            "/tasks/result",
            post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;

        let err = HttpResultReporter::new(url).report(message()).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_slow_coordinator_times_out() {
        let url = spawn(Router::new().route(
            "/tasks/result",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                StatusCode::OK
            }),
        ))
        .await;

        let reporter = HttpResultReporter::new(url).with_timeout(Duration::from_millis(100));
        assert!(reporter.report(message()).await.is_err());
    }
}
