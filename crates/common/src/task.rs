//! Coordinator-side task status types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle state of a task as seen by polling clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Processing,
    Completed,
    Failed,
    RequiresClarification,
    Unknown,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RequiresClarification => "requires_clarification",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the task has left `processing`. Settled records are never
    /// moved back.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error attached to a task record or a failed task result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Short machine-readable tag, e.g. `BUCKET_NOT_FOUND`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Human-readable diagnostic
    #[serde(default)]
    pub message: String,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// The coordinator's record for one task.
///
/// Optional fields serialize as `null` so pollers always see the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusRecord {
    pub status: TaskState,
    #[serde(default)]
    pub result: Option<Map<String, Value>>,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
    #[serde(default)]
    pub question: Option<String>,
}

impl TaskStatusRecord {
    pub fn processing() -> Self {
        Self::with_state(TaskState::Processing)
    }

    pub fn with_state(status: TaskState) -> Self {
        Self {
            status,
            result: None,
            error: None,
            question: None,
        }
    }

    pub fn failed(error: ErrorDetail) -> Self {
        Self {
            error: Some(error),
            ..Self::with_state(TaskState::Failed)
        }
    }
}
