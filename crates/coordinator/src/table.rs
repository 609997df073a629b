//! The coordinator's in-memory task table.
//!
//! One [`TaskStatusRecord`] per task id. A record starts `processing` and is
//! settled exactly once; later results for the same task are ignored. Every
//! mutation is a single write-lock critical section with no await inside.

use parking_lot::RwLock;
use relay_common::{ErrorDetail, ResultStatus, TaskResultPayload, TaskState, TaskStatusRecord};
use serde::Serialize;
use serde_json::Map;
use std::collections::HashMap;
use tracing::{debug, warn};

pub const INVALID_RESULT_PAYLOAD: &str = "INVALID_RESULT_PAYLOAD";

/// What applying a result did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The record moved to this state.
    Settled(TaskState),
    /// The record was already settled in this state; nothing changed.
    Duplicate(TaskState),
}

/// One row of [`TaskTable::list`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub status: TaskState,
}

#[derive(Default)]
pub struct TaskTable {
    records: RwLock<HashMap<String, TaskStatusRecord>>,
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the `processing` record for a freshly triggered task.
    pub fn insert_processing(&self, task_id: &str) {
        self.records
            .write()
            .insert(task_id.to_string(), TaskStatusRecord::processing());
    }

    /// Fail a task whose assignment could not be delivered. A result that
    /// raced ahead of the dispatch error wins.
    pub fn mark_dispatch_failed(&self, task_id: &str, error: ErrorDetail) -> ApplyOutcome {
        self.settle(task_id, TaskStatusRecord::failed(error))
    }

    /// Apply a well-formed `task_result` payload. Unknown ids are created on
    /// the fly.
    pub fn apply_result(&self, task_id: &str, payload: &TaskResultPayload) -> ApplyOutcome {
        self.settle(task_id, settled_record(payload))
    }

    /// Record a `task_result` whose payload could not be decoded.
    pub fn apply_malformed(&self, task_id: &str, reason: &str) -> ApplyOutcome {
        self.settle(
            task_id,
            TaskStatusRecord::failed(ErrorDetail::new(
                INVALID_RESULT_PAYLOAD,
                format!("Internal error processing result payload: {}", reason),
            )),
        )
    }

    pub fn get(&self, task_id: &str) -> Option<TaskStatusRecord> {
        self.records.read().get(task_id).cloned()
    }

    pub fn list(&self) -> Vec<TaskSummary> {
        let mut rows: Vec<TaskSummary> = self
            .records
            .read()
            .iter()
            .map(|(id, record)| TaskSummary {
                task_id: id.clone(),
                status: record.status,
            })
            .collect();
        rows.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        rows
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn settle(&self, task_id: &str, record: TaskStatusRecord) -> ApplyOutcome {
        let mut records = self.records.write();
        let entry = records.entry(task_id.to_string()).or_insert_with(|| {
            warn!(task_id = %task_id, "Result for untracked task; creating record");
            TaskStatusRecord::processing()
        });

        if entry.status.is_settled() {
            debug!(task_id = %task_id, status = %entry.status, "Task already settled");
            return ApplyOutcome::Duplicate(entry.status);
        }

        *entry = record;
        ApplyOutcome::Settled(entry.status)
    }
}

/// The record a result payload settles into.
pub fn settled_record(payload: &TaskResultPayload) -> TaskStatusRecord {
    match &payload.status {
        ResultStatus::Completed => TaskStatusRecord {
            result: Some(payload.result.clone().unwrap_or_else(Map::new)),
            ..TaskStatusRecord::with_state(TaskState::Completed)
        },
        ResultStatus::Failed => TaskStatusRecord::failed(
            payload
                .error
                .clone()
                .unwrap_or_else(|| ErrorDetail::message_only("Unknown error from agent.")),
        ),
        ResultStatus::RequiresClarification => TaskStatusRecord {
            question: Some(
                payload
                    .question
                    .clone()
                    .unwrap_or_else(|| "Clarification needed, no question provided.".into()),
            ),
            ..TaskStatusRecord::with_state(TaskState::RequiresClarification)
        },
        ResultStatus::Other(status) => TaskStatusRecord {
            error: Some(ErrorDetail::message_only(format!(
                "Received unknown status: {}",
                status
            ))),
            ..TaskStatusRecord::with_state(TaskState::Unknown)
        },
    }
}
