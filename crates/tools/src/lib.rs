//! Tool-call plumbing for the relay services.
//!
//! - [`McpToolAdapter`]: the client agents use to call tool servers
//! - [`tool_router`]: mounts any [`ToolHandler`] behind `POST /tool`
//! - reference servers: [`CreativeLlmServer`], [`WebSearchServer`], [`CloudStorageServer`]

pub mod adapter;
pub mod creative;
pub mod search;
pub mod server;
pub mod storage;

pub use adapter::{MCP_CALL_FAILED, McpToolAdapter, ToolInvoker, UNEXPECTED_ERROR};
pub use creative::CreativeLlmServer;
pub use search::{SearchHit, WebSearchServer};
pub use server::{ToolDescriptor, ToolHandler, serve, tool_router};
pub use storage::{BlobStore, CloudStorageServer, blob_routes};
