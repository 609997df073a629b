//! The agent trait and the classified outcome of running a task.

use async_trait::async_trait;
use relay_common::{AssignTask, ErrorDetail, Result, TaskResultPayload};
use serde_json::{Map, Value};

/// Classified result of one task execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The expected artifact was produced.
    Completed(Map<String, Value>),
    /// The task ran but did not produce a usable artifact.
    Failed(ErrorDetail),
    /// The agent needs more input before it can proceed.
    NeedsClarification(String),
}

impl Outcome {
    pub fn failed(code: &str, message: impl Into<String>) -> Self {
        Self::Failed(ErrorDetail::new(code, message))
    }

    pub fn into_payload(self) -> TaskResultPayload {
        match self {
            Self::Completed(result) => TaskResultPayload::completed(result),
            Self::Failed(error) => TaskResultPayload::failed(error),
            Self::NeedsClarification(q) => TaskResultPayload::requires_clarification(q),
        }
    }
}

/// An agent that fulfills one task type.
///
/// Parameter presence is checked by the task handler before [`run`](Self::run)
/// is called. Returning `Err` is reported as `AGENT_RUNTIME_ERROR`; semantic
/// failures should be returned as [`Outcome::Failed`].
#[async_trait]
pub trait TaskAgent: Send + Sync {
    /// Logical component name, e.g. `article_draft_agent`.
    fn id(&self) -> &str;

    /// Task type this agent accepts.
    fn task_type(&self) -> &str;

    /// Parameters that must be present and non-blank.
    fn required_parameters(&self) -> &[&'static str];

    async fn run(&self, task_id: &str, assignment: &AssignTask) -> Result<Outcome>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_common::ResultStatus;

    #[test]
    fn test_outcome_maps_to_payload() {
        let payload = Outcome::failed("BUCKET_NOT_FOUND", "gone").into_payload();
        assert_eq!(payload.status, ResultStatus::Failed);
        assert_eq!(payload.error.unwrap().code.as_deref(), Some("BUCKET_NOT_FOUND"));
        assert!(payload.result.is_none());

        let payload = Outcome::NeedsClarification("Which audience?".into()).into_payload();
        assert_eq!(payload.status, ResultStatus::RequiresClarification);
        assert_eq!(payload.question.as_deref(), Some("Which audience?"));

        let payload = Outcome::Completed(Map::new()).into_payload();
        assert_eq!(payload.status, ResultStatus::Completed);
        assert_eq!(payload.result, Some(Map::new()));
    }
}
