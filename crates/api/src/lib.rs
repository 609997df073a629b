//! HTTP surface of the relay coordinator.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /tasks/trigger/{kind}` - Start a task; query parameters become task parameters
//! - `POST /tasks/result` - Result ingestion for agents
//! - `GET /tasks/{task_id}/status` - Task status for pollers
//! - `GET /tasks` - Snapshot of all tasks
//!
//! # Architecture
//!
//! ```text
//! Client ──trigger/status──▶ ┌─────────────────┐ ──assign_task──▶ Agents
//!                            │   Coordinator   │
//!                            │     (Axum)      │ ◀──task_result── Agents
//!                            └─────────────────┘
//! ```

pub mod routes;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use state::AppState;

/// Create the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/tasks", get(routes::list_tasks))
        .route("/tasks/trigger/{kind}", post(routes::trigger_task))
        .route("/tasks/result", post(routes::receive_result))
        .route("/tasks/{task_id}/status", get(routes::task_status))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the coordinator server on the given address.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let router = create_router(state);

    info!(%addr, "Starting relay coordinator");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
