//! Task coordination for the relay.
//!
//! The coordinator is the single owner of task state. It:
//! 1. Creates a `processing` record and dispatches `assign_task` to an agent
//! 2. Returns the task id without waiting for the agent
//! 3. Settles the record when the agent posts its `task_result`
//! 4. Answers status queries from polling clients
//!
//! # Architecture
//!
//! ```text
//! trigger(kind)          ingest_result(msg)        get_status(id)
//!      │                        │                        │
//!      ▼                        ▼                        ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                     TaskManager                          │
//! │   CoordinatorConfig ── routes ──▶ AgentDispatcher        │
//! │                     TaskTable                            │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod dispatch;
pub mod manager;
pub mod table;

pub use config::{AgentRoute, CoordinatorConfig};
pub use dispatch::{AgentDispatcher, DispatchError, HttpDispatcher};
pub use manager::{AckStatus, DISPATCH_FAILED, ResultAck, TaskManager, TriggerError};
pub use table::{ApplyOutcome, TaskSummary, TaskTable};
