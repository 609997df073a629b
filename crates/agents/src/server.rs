//! HTTP surface of an agent service.
//!
//! - `POST /message` - receive a [`TaskMessage`]
//! - `GET /health` - liveness
//!
//! `assign_task` messages are acknowledged with `processing` immediately and
//! handled on a spawned task; the outcome reaches the coordinator only through
//! the result reporter.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use relay_common::{MessageBody, MessageType, TaskMessage};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handler::TaskHandler;

/// Shared state of an agent server.
pub struct AgentState {
    pub handler: Arc<TaskHandler>,
    pub start_time: Instant,
}

impl AgentState {
    pub fn new(handler: TaskHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Synchronous answer to `POST /message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageAck {
    pub status: String,
    pub message_id: String,
    pub detail: String,
}

impl MessageAck {
    fn new(status: &str, message: &TaskMessage, detail: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            message_id: message.message_id.clone(),
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    agent: String,
    version: &'static str,
    uptime_seconds: u64,
}

pub fn create_router(state: Arc<AgentState>) -> Router {
    Router::new()
        .route("/message", post(receive_message))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn receive_message(
    State(state): State<Arc<AgentState>>,
    Json(message): Json<TaskMessage>,
) -> Json<MessageAck> {
    info!(
        agent = %state.handler.agent_id(),
        task_id = %message.task_id,
        message_type = %message.body.type_tag(),
        sender = %message.sender_id,
        "Received message"
    );

    let reply = match &message.body {
        MessageBody::AssignTask(_)
        | MessageBody::Malformed {
            message_type: MessageType::AssignTask,
            ..
        } => None,
        MessageBody::StatusUpdate(_) | MessageBody::TaskResult(_) | MessageBody::Error(_) => {
            Some(MessageAck::new("ack", &message, "Message acknowledged."))
        }
        MessageBody::Unknown { message_type, .. } => {
            warn!(message_type = %message_type, "Unknown message type");
            Some(MessageAck::new(
                "error",
                &message,
                format!("Unknown message type: {}", message_type),
            ))
        }
        MessageBody::Malformed { reason, .. } => {
            warn!(reason = %reason, "Malformed message payload");
            Some(MessageAck::new(
                "error",
                &message,
                format!("Invalid payload: {}", reason),
            ))
        }
    };
    if let Some(reply) = reply {
        return Json(reply);
    }

    if !message.has_task_id() {
        warn!("assign_task without task_id rejected");
        return Json(MessageAck::new(
            "error",
            &message,
            "assign_task message is missing task_id.",
        ));
    }

    let ack = MessageAck::new("processing", &message, "Task accepted for processing.");
    let handler = state.handler.clone();
    tokio::spawn(async move {
        handler.handle_assignment(message).await;
    });
    Json(ack)
}

async fn health(State(state): State<Arc<AgentState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        agent: state.handler.agent_id().to_string(),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Start the agent server on the given address.
pub async fn serve(state: Arc<AgentState>, addr: SocketAddr) -> anyhow::Result<()> {
    let router = create_router(state.clone());

    info!(%addr, agent = %state.handler.agent_id(), "Starting agent server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
