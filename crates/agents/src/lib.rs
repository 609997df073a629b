//! Agent services for the relay.
//!
//! An agent service receives `assign_task` messages on `POST /message`,
//! acknowledges them immediately, runs the task through a tool plan and
//! reports exactly one `task_result` back to the coordinator.
//!
//! - **Article draft agent**: generates an article and uploads it to cloud storage
//! - **Research agent**: searches the web and summarizes the results
//!
//! # Architecture
//!
//! ```text
//!  Coordinator ──assign_task──▶ POST /message ──spawn──▶ TaskHandler
//!       ▲                                                    │
//!       │                                                    ▼
//!       │                                             TaskAgent::run
//!       │                                                    │ ToolPlan
//!       │                                                    ▼
//!       │                                      McpToolAdapter ──▶ tool servers
//!       │                                                    │
//!       └───────────── task_result ◀── ResultReporter ◀──────┘
//! ```

pub mod agent;
pub mod article;
pub mod config;
pub mod handler;
pub mod planning;
pub mod reporter;
pub mod research;
pub mod server;

pub use agent::{Outcome, TaskAgent};
pub use article::ArticleDraftAgent;
pub use config::AgentServiceConfig;
pub use handler::{COORDINATOR_ID, TaskHandler};
pub use planning::{PlanRun, StepRecord, ToolPlan};
pub use reporter::{HttpResultReporter, ResultReporter};
pub use research::ResearchAgent;
pub use server::{AgentState, MessageAck, create_router, serve};
