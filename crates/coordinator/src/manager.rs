//! The task manager: trigger, result ingestion and status queries.

use relay_common::{
    AssignTask, ErrorDetail, MessageBody, MessageType, TaskMessage, TaskStatusRecord, new_id,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::CoordinatorConfig;
use crate::dispatch::{AgentDispatcher, DispatchError, HttpDispatcher};
use crate::table::{ApplyOutcome, TaskSummary, TaskTable};

pub const DISPATCH_FAILED: &str = "DISPATCH_FAILED";

/// Synchronous trigger failures.
#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("Unknown task kind: {0}")]
    UnknownKind(String),

    #[error("Required parameter '{0}' is missing.")]
    MissingParameter(String),

    /// The task was created and then failed because the assignment could not
    /// be delivered.
    #[error("Failed to communicate with {agent_id}: {source}")]
    Dispatch {
        task_id: String,
        agent_id: String,
        source: DispatchError,
    },
}

/// Status of a result acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    Ack,
    AckError,
    Error,
}

/// Answer to an ingested result message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultAck {
    pub status: AckStatus,
    pub message_id: String,
    pub detail: String,
}

impl ResultAck {
    fn new(status: AckStatus, message: &TaskMessage, detail: impl Into<String>) -> Self {
        Self {
            status,
            message_id: message.message_id.clone(),
            detail: detail.into(),
        }
    }
}

pub struct TaskManager {
    config: CoordinatorConfig,
    table: TaskTable,
    dispatcher: Arc<dyn AgentDispatcher>,
}

impl TaskManager {
    /// Create a manager that dispatches over HTTP.
    pub fn new(config: CoordinatorConfig) -> Self {
        let dispatcher = Arc::new(HttpDispatcher::new(config.dispatch_timeout()));
        Self::with_dispatcher(config, dispatcher)
    }

    pub fn with_dispatcher(config: CoordinatorConfig, dispatcher: Arc<dyn AgentDispatcher>) -> Self {
        Self {
            config,
            table: TaskTable::new(),
            dispatcher,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Start a task of the given kind and return its id without waiting for
    /// the agent to finish.
    ///
    /// A dispatch timeout counts as delivered. Any other dispatch failure
    /// settles the record as failed and is returned to the caller.
    pub async fn trigger(
        &self,
        kind: &str,
        parameters: Map<String, Value>,
    ) -> Result<String, TriggerError> {
        let route = self
            .config
            .route(kind)
            .ok_or_else(|| TriggerError::UnknownKind(kind.to_string()))?;

        let mut merged = route.default_parameters.clone();
        merged.extend(parameters);

        if let Some(missing) = route
            .required_parameters
            .iter()
            .find(|p| !is_present(merged.get(p.as_str())))
        {
            return Err(TriggerError::MissingParameter(missing.clone()));
        }

        let task_id = new_id();
        self.table.insert_processing(&task_id);
        info!(task_id = %task_id, kind = %kind, agent = %route.agent_id, "Task created");

        let message = TaskMessage::assign(
            &task_id,
            &self.config.coordinator_id,
            &route.agent_id,
            AssignTask::new(&route.task_type, merged),
        );

        match self.dispatcher.dispatch(&route.endpoint, &message).await {
            Ok(()) => {
                debug!(task_id = %task_id, "Assignment delivered");
                Ok(task_id)
            }
            Err(e) if e.is_timeout() => {
                warn!(
                    task_id = %task_id,
                    agent = %route.agent_id,
                    "Agent did not answer in time; assuming assignment delivered"
                );
                Ok(task_id)
            }
            Err(e) => {
                error!(task_id = %task_id, agent = %route.agent_id, error = %e, "Dispatch failed");
                self.table.mark_dispatch_failed(
                    &task_id,
                    ErrorDetail::new(
                        DISPATCH_FAILED,
                        format!("Failed to communicate with {}: {}", route.agent_id, e),
                    ),
                );
                Err(TriggerError::Dispatch {
                    task_id,
                    agent_id: route.agent_id.clone(),
                    source: e,
                })
            }
        }
    }

    /// Apply a message posted to the result endpoint. Never fails; problems
    /// are reported in the acknowledgement.
    pub fn ingest_result(&self, message: &TaskMessage) -> ResultAck {
        if !message.has_task_id() {
            warn!(message_id = %message.message_id, "Result message missing task_id");
            return ResultAck::new(
                AckStatus::AckError,
                message,
                "Result received but task_id missing.",
            );
        }
        let task_id = message.task_id.as_str();

        match &message.body {
            MessageBody::TaskResult(payload) => {
                debug!(task_id = %task_id, payload = ?payload, "Applying task result");
                match self.table.apply_result(task_id, payload) {
                    ApplyOutcome::Settled(state) => {
                        info!(task_id = %task_id, status = %state, "Task settled");
                        ResultAck::new(
                            AckStatus::Ack,
                            message,
                            format!("Result processed; task is now {}.", state),
                        )
                    }
                    ApplyOutcome::Duplicate(state) => {
                        warn!(task_id = %task_id, status = %state, "Duplicate result ignored");
                        ResultAck::new(
                            AckStatus::Ack,
                            message,
                            format!("duplicate: task already {}.", state),
                        )
                    }
                }
            }
            MessageBody::Malformed {
                message_type: MessageType::TaskResult,
                reason,
                ..
            } => {
                error!(task_id = %task_id, reason = %reason, "Malformed task_result payload");
                self.table.apply_malformed(task_id, reason);
                ResultAck::new(
                    AckStatus::AckError,
                    message,
                    format!("Internal error processing result payload: {}", reason),
                )
            }
            MessageBody::StatusUpdate(update) => {
                info!(
                    task_id = %task_id,
                    status = %update.status,
                    progress = ?update.progress,
                    "Status update received"
                );
                ResultAck::new(AckStatus::Ack, message, "Status update acknowledged.")
            }
            MessageBody::Error(details) => {
                warn!(task_id = %task_id, details = ?details, "Error message received");
                ResultAck::new(AckStatus::Ack, message, "Error message acknowledged.")
            }
            other => {
                warn!(task_id = %task_id, message_type = %other.type_tag(), "Unexpected message type on result endpoint");
                ResultAck::new(
                    AckStatus::Error,
                    message,
                    format!("Unexpected message type on result endpoint: {}", other.type_tag()),
                )
            }
        }
    }

    pub fn get_status(&self, task_id: &str) -> Option<TaskStatusRecord> {
        self.table.get(task_id)
    }

    pub fn list(&self) -> Vec<TaskSummary> {
        self.table.list()
    }

    pub fn task_count(&self) -> usize {
        self.table.len()
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}
