//! Common types shared across the relay crates.
//!
//! This crate holds the wire contracts every service speaks:
//!
//! - [`TaskMessage`]: the envelope exchanged between the coordinator and agents
//! - [`ToolCall`] / [`ToolResult`]: the envelope exchanged between agents and tool servers
//! - [`TaskStatusRecord`]: the per-task state the coordinator exposes to pollers

pub mod error;
pub mod message;
pub mod task;
pub mod tool;

pub use error::{RelayError, Result};
pub use message::{
    AssignTask, MessageBody, MessageType, ResultStatus, StatusUpdate, TaskMessage,
    TaskResultPayload,
};
pub use task::{ErrorDetail, TaskState, TaskStatusRecord};
pub use tool::{
    DeleteFileParams, DownloadFileParams, GenerateTextParams, SearchWebParams, ToolCall,
    ToolError, ToolParameters, ToolResult, ToolStatus, UploadFileParams,
};

/// Generate a fresh opaque identifier for tasks and messages.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
