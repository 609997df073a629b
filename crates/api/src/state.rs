//! Application state for the coordinator server.

use relay_coordinator::{CoordinatorConfig, TaskManager};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for the coordinator server.
pub struct AppState {
    /// Owner of the task table
    pub manager: Arc<TaskManager>,

    /// Server start time (for health checks)
    pub start_time: Instant,
}

impl AppState {
    /// Create state with an HTTP-dispatching task manager.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self::with_manager(TaskManager::new(config))
    }

    pub fn with_manager(manager: TaskManager) -> Self {
        Self {
            manager: Arc::new(manager),
            start_time: Instant::now(),
        }
    }

    /// Get the uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
