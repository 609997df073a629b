//! Agent task handler.
//!
//! Every accepted `assign_task` message yields exactly one `task_result`
//! report, whether validation fails, the agent returns an error, or the
//! agent panics.

use relay_common::{ErrorDetail, MessageBody, TaskMessage, TaskResultPayload};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::agent::{Outcome, TaskAgent};
use crate::reporter::ResultReporter;

pub const COORDINATOR_ID: &str = "task_manager_agent";

pub struct TaskHandler {
    agent: Arc<dyn TaskAgent>,
    reporter: Arc<dyn ResultReporter>,
}

impl TaskHandler {
    pub fn new(agent: Arc<dyn TaskAgent>, reporter: Arc<dyn ResultReporter>) -> Self {
        Self { agent, reporter }
    }

    pub fn agent_id(&self) -> &str {
        self.agent.id()
    }

    /// Process an assignment and report its outcome. Returns the payload
    /// that was reported.
    pub async fn handle_assignment(&self, message: TaskMessage) -> TaskResultPayload {
        let task_id = message.task_id.clone();
        info!(
            agent = %self.agent.id(),
            task_id = %task_id,
            message_id = %message.message_id,
            "Handling assignment"
        );

        let outcome = self.execute(&message).await;
        let payload = outcome.into_payload();

        let receiver = if message.sender_id.trim().is_empty() {
            COORDINATOR_ID.to_string()
        } else {
            message.sender_id.clone()
        };
        let report = TaskMessage::result(&task_id, self.agent.id(), receiver, payload.clone())
            .with_context(message.context);

        if let Err(e) = self.reporter.report(report).await {
            error!(task_id = %task_id, error = %e, "Failed to report task result");
        }

        payload
    }

    async fn execute(&self, message: &TaskMessage) -> Outcome {
        let assignment = match &message.body {
            MessageBody::AssignTask(a) => a.clone(),
            MessageBody::Malformed { reason, .. } => {
                warn!(task_id = %message.task_id, reason = %reason, "Malformed assignment payload");
                return Outcome::failed(
                    "INVALID_PAYLOAD",
                    format!("Invalid payload for assign_task message: {}", reason),
                );
            }
            other => {
                return Outcome::failed(
                    "INVALID_PAYLOAD",
                    format!("Expected assign_task, got '{}'", other.type_tag()),
                );
            }
        };

        if assignment.task_type != self.agent.task_type() {
            warn!(task_type = %assignment.task_type, "Unknown task type");
            return Outcome::failed(
                "UNKNOWN_TASK_TYPE",
                format!(
                    "Unknown task type received by {}: {}",
                    self.agent.id(),
                    assignment.task_type
                ),
            );
        }

        if let Some(missing) = self
            .agent
            .required_parameters()
            .iter()
            .find(|p| assignment.parameter_str(p).is_none())
        {
            return Outcome::failed(
                "MISSING_PARAMETER",
                format!("Required parameter '{}' is missing.", missing),
            );
        }

        // Run on its own task so a panic surfaces as a JoinError
        let agent = self.agent.clone();
        let task_id = message.task_id.clone();
        let joined = tokio::spawn(async move { agent.run(&task_id, &assignment).await }).await;

        match joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(task_id = %message.task_id, error = %e, "Agent runtime error");
                Outcome::Failed(ErrorDetail::new(
                    "AGENT_RUNTIME_ERROR",
                    format!("Unexpected error during agent runtime: {}", e),
                ))
            }
            Err(e) if e.is_panic() => {
                error!(task_id = %message.task_id, "Agent panicked");
                Outcome::failed("AGENT_PANICKED", "Agent panicked while processing the task.")
            }
            Err(e) => Outcome::failed(
                "AGENT_RUNTIME_ERROR",
                format!("Agent task was cancelled: {}", e),
            ),
        }
    }
}
