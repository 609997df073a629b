//! Agent service configuration, read from the environment.

use std::time::Duration;

use crate::reporter::DEFAULT_RESULT_TIMEOUT;

pub const DEFAULT_RESULT_URL: &str = "http://localhost:8000/tasks/result";
pub const DEFAULT_CREATIVE_LLM_URL: &str = "http://localhost:8101/tool";
pub const DEFAULT_WEB_SEARCH_URL: &str = "http://localhost:8102/tool";
pub const DEFAULT_CLOUD_STORAGE_URL: &str = "http://localhost:8103/tool";

/// Endpoints and settings shared by the agent binaries.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentServiceConfig {
    /// Coordinator result-ingestion endpoint
    pub result_url: String,
    pub creative_llm_url: String,
    pub web_search_url: String,
    pub cloud_storage_url: String,
    /// Bucket the article agent uploads into
    pub bucket_name: Option<String>,
    pub result_timeout: Duration,
}

impl Default for AgentServiceConfig {
    fn default() -> Self {
        Self {
            result_url: DEFAULT_RESULT_URL.to_string(),
            creative_llm_url: DEFAULT_CREATIVE_LLM_URL.to_string(),
            web_search_url: DEFAULT_WEB_SEARCH_URL.to_string(),
            cloud_storage_url: DEFAULT_CLOUD_STORAGE_URL.to_string(),
            bucket_name: None,
            result_timeout: DEFAULT_RESULT_TIMEOUT,
        }
    }
}

impl AgentServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let result_timeout = match get("RELAY_RESULT_TIMEOUT_MS").map(|v| v.parse::<u64>()) {
            Some(Ok(ms)) => Duration::from_millis(ms),
            Some(Err(_)) => {
                tracing::warn!("Ignoring invalid RELAY_RESULT_TIMEOUT_MS");
                defaults.result_timeout
            }
            None => defaults.result_timeout,
        };

        Self {
            result_url: get("TASK_MANAGER_RESULT_URL").unwrap_or(defaults.result_url),
            creative_llm_url: get("CREATIVE_LLM_MCP_URL").unwrap_or(defaults.creative_llm_url),
            web_search_url: get("WEB_SEARCH_MCP_URL").unwrap_or(defaults.web_search_url),
            cloud_storage_url: get("CLOUD_STORAGE_MCP_URL").unwrap_or(defaults.cloud_storage_url),
            bucket_name: get("CLOUD_STORAGE_BUCKET_NAME"),
            result_timeout,
        }
    }
}
