//! HTTP route handlers for the coordinator.

use crate::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use relay_common::{TaskMessage, TaskStatusRecord};
use relay_coordinator::{ResultAck, TaskSummary, TriggerError};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub tasks: usize,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        tasks: state.manager.task_count(),
    })
}

/// Response to an accepted trigger.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub status: &'static str,
    pub task_id: String,
    pub message: String,
}

/// Response to a trigger whose dispatch failed. The task exists and is failed.
#[derive(Debug, Serialize)]
pub struct DispatchFailedResponse {
    pub status: &'static str,
    pub task_id: String,
    pub detail: String,
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// 404 body for status queries.
#[derive(Debug, Serialize)]
pub struct NotFoundResponse {
    pub detail: String,
}

/// Errors surfaced synchronously by the trigger endpoint.
pub struct TriggerRejection(TriggerError);

impl IntoResponse for TriggerRejection {
    fn into_response(self) -> Response {
        match self.0 {
            TriggerError::UnknownKind(kind) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Unknown task kind: {}", kind),
                    code: "UNKNOWN_TASK_KIND",
                }),
            )
                .into_response(),
            TriggerError::MissingParameter(name) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Required parameter '{}' is missing.", name),
                    code: "MISSING_PARAMETER",
                }),
            )
                .into_response(),
            TriggerError::Dispatch {
                task_id,
                agent_id,
                source,
            } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(DispatchFailedResponse {
                    status: "failed",
                    task_id,
                    detail: format!("Failed to communicate with {}: {}", agent_id, source),
                }),
            )
                .into_response(),
        }
    }
}

/// Start a task. Query parameters become task parameters.
pub async fn trigger_task(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<TriggerResponse>, TriggerRejection> {
    info!(kind = %kind, params = ?query.keys().collect::<Vec<_>>(), "Trigger request");

    let parameters: Map<String, Value> = query
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    let task_id = state
        .manager
        .trigger(&kind, parameters)
        .await
        .map_err(|e| {
            warn!(kind = %kind, error = %e, "Trigger rejected");
            TriggerRejection(e)
        })?;

    Ok(Json(TriggerResponse {
        status: "processing",
        message: format!("Task '{}' assignment sent.", kind),
        task_id,
    }))
}

/// Result-ingestion endpoint for agents.
pub async fn receive_result(
    State(state): State<Arc<AppState>>,
    Json(message): Json<TaskMessage>,
) -> Json<ResultAck> {
    debug!(
        task_id = %message.task_id,
        message_id = %message.message_id,
        sender = %message.sender_id,
        message_type = %message.body.type_tag(),
        "Result message received"
    );
    Json(state.manager.ingest_result(&message))
}

/// Task status for pollers.
pub async fn task_status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatusRecord>, (StatusCode, Json<NotFoundResponse>)> {
    match state.manager.get_status(&task_id) {
        Some(record) => Ok(Json(record)),
        None => {
            warn!(task_id = %task_id, "Status requested for unknown task");
            Err((
                StatusCode::NOT_FOUND,
                Json(NotFoundResponse {
                    detail: "Task not found".into(),
                }),
            ))
        }
    }
}

/// Snapshot of all tasks.
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<TaskSummary>> {
    Json(state.manager.list())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy",
            version: "0.1.0",
            uptime_seconds: 100,
            tasks: 3,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("\"tasks\":3"));
    }

    #[test]
    fn test_missing_parameter_is_400() {
        let response =
            TriggerRejection(TriggerError::MissingParameter("topic".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
