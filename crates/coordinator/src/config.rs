//! Configuration for the coordinator.
//!
//! Routes map a trigger kind (`article`, `research`) to the agent that
//! handles it. A TOML file replaces the defaults; the agent endpoints and the
//! dispatch timeout can then be overridden from the environment.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_COORDINATOR_ID: &str = "task_manager_agent";
pub const DEFAULT_DISPATCH_TIMEOUT_MS: u64 = 5000;

/// Main coordinator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Sender id stamped on outgoing assignments
    #[serde(default = "default_coordinator_id")]
    pub coordinator_id: String,

    /// Send timeout for assignments; expiry is treated as delivered
    #[serde(default = "default_dispatch_timeout")]
    pub dispatch_timeout_ms: u64,

    /// Trigger kind -> agent route
    #[serde(default)]
    pub routes: BTreeMap<String, AgentRoute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRoute {
    /// Logical agent name, e.g. `article_draft_agent`
    pub agent_id: String,

    /// Agent `POST /message` URL
    pub endpoint: String,

    /// `task_type` sent in the assignment
    pub task_type: String,

    /// Parameters that must be present and non-blank at trigger time
    #[serde(default)]
    pub required_parameters: Vec<String>,

    /// Parameters merged under the caller's
    #[serde(default)]
    pub default_parameters: Map<String, Value>,
}

fn default_coordinator_id() -> String {
    DEFAULT_COORDINATOR_ID.into()
}

fn default_dispatch_timeout() -> u64 {
    DEFAULT_DISPATCH_TIMEOUT_MS
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        let mut routes = BTreeMap::new();
        routes.insert(
            "article".to_string(),
            AgentRoute {
                agent_id: "article_draft_agent".into(),
                endpoint: "http://localhost:8001/message".into(),
                task_type: "write_article_draft".into(),
                required_parameters: vec!["topic".into()],
                default_parameters: Map::new(),
            },
        );

        let mut research_defaults = Map::new();
        research_defaults.insert("language".into(), Value::String("Turkish".into()));
        research_defaults.insert("max_words".into(), Value::from(500));
        routes.insert(
            "research".to_string(),
            AgentRoute {
                agent_id: "researcher_agent".into(),
                endpoint: "http://localhost:8002/message".into(),
                task_type: "research".into(),
                required_parameters: vec!["topic".into()],
                default_parameters: research_defaults,
            },
        );

        Self {
            coordinator_id: default_coordinator_id(),
            dispatch_timeout_ms: DEFAULT_DISPATCH_TIMEOUT_MS,
            routes,
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Self = toml::from_str(&content)?;

        if config.routes.is_empty() {
            warn!(
                "Config file '{}' defines no routes; every trigger will be rejected",
                path.display()
            );
        }

        Ok(config)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    pub fn route(&self, kind: &str) -> Option<&AgentRoute> {
        self.routes.get(kind)
    }

    /// Apply `ARTICLE_DRAFT_AGENT_URL`, `RESEARCHER_AGENT_URL` and
    /// `RELAY_DISPATCH_TIMEOUT_MS` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        for (kind, var) in [("article", "ARTICLE_DRAFT_AGENT_URL"), ("research", "RESEARCHER_AGENT_URL")] {
            if let (Some(url), Some(route)) = (get(var), self.routes.get_mut(kind)) {
                route.endpoint = url;
            }
        }

        if let Some(raw) = get("RELAY_DISPATCH_TIMEOUT_MS") {
            match raw.parse() {
                Ok(ms) => self.dispatch_timeout_ms = ms,
                Err(_) => warn!(value = %raw, "Ignoring invalid RELAY_DISPATCH_TIMEOUT_MS"),
            }
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_routes() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.dispatch_timeout(), Duration::from_secs(5));

        let article = config.route("article").unwrap();
        assert_eq!(article.agent_id, "article_draft_agent");
        assert_eq!(article.task_type, "write_article_draft");
        assert_eq!(article.required_parameters, vec!["topic".to_string()]);

        let research = config.route("research").unwrap();
        assert_eq!(research.endpoint, "http://localhost:8002/message");
        assert_eq!(research.default_parameters["language"], "Turkish");
        assert_eq!(research.default_parameters["max_words"], 500);

        assert!(config.route("poem").is_none());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
dispatch_timeout_ms = 750

[routes.summary]
agent_id = "summary_agent"
endpoint = "http://summary:9000/message"
task_type = "summarize"
required_parameters = ["text"]

[routes.summary.default_parameters]
max_words = 100
"#
        )
        .unwrap();

        let config = CoordinatorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.coordinator_id, DEFAULT_COORDINATOR_ID);
        assert_eq!(config.dispatch_timeout_ms, 750);
        assert_eq!(config.routes.len(), 1);

        let route = config.route("summary").unwrap();
        assert_eq!(route.task_type, "summarize");
        assert_eq!(route.default_parameters["max_words"], 100);
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = CoordinatorConfig::from_file(dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn test_env_overrides() {
        let config = CoordinatorConfig::default().with_overrides(|key| match key {
            "ARTICLE_DRAFT_AGENT_URL" => Some("http://article:9001/message".into()),
            "RESEARCHER_AGENT_URL" => Some("  ".into()),
            "RELAY_DISPATCH_TIMEOUT_MS" => Some("1200".into()),
            _ => None,
        });
        assert_eq!(config.route("article").unwrap().endpoint, "http://article:9001/message");
        assert_eq!(config.route("research").unwrap().endpoint, "http://localhost:8002/message");
        assert_eq!(config.dispatch_timeout_ms, 1200);
    }

    #[test]
    fn test_invalid_timeout_override_is_ignored() {
        let config = CoordinatorConfig::default()
            .with_overrides(|key| (key == "RELAY_DISPATCH_TIMEOUT_MS").then(|| "fast".to_string()));
        assert_eq!(config.dispatch_timeout_ms, DEFAULT_DISPATCH_TIMEOUT_MS);
    }
}
