//! Agent service binary.
//!
//! Usage:
//!   relay-agent --kind article
//!   relay-agent --kind research --port 8002
//!
//! # Environment Variables
//!
//! - `TASK_MANAGER_RESULT_URL` - coordinator result endpoint (default: `http://localhost:8000/tasks/result`)
//! - `CREATIVE_LLM_MCP_URL`, `WEB_SEARCH_MCP_URL`, `CLOUD_STORAGE_MCP_URL` - tool server endpoints
//! - `CLOUD_STORAGE_BUCKET_NAME` - bucket for article drafts (required by `article`)
//! - `RELAY_RESULT_TIMEOUT_MS` - timeout for reporting results (default: 10000)

use clap::{Parser, ValueEnum};
use relay_agents::{
    AgentServiceConfig, AgentState, ArticleDraftAgent, HttpResultReporter, ResearchAgent,
    TaskAgent, TaskHandler, serve,
};
use relay_tools::{McpToolAdapter, ToolInvoker};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Article,
    Research,
}

impl Kind {
    fn default_port(self) -> u16 {
        match self {
            Kind::Article => 8001,
            Kind::Research => 8002,
        }
    }
}

#[derive(Parser)]
#[command(name = "relay-agent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Relay agent service", long_about = None)]
struct Cli {
    /// Which agent to run
    #[arg(short, long, value_enum)]
    kind: Kind,

    /// Port to listen on (defaults to 8001/8002 by kind)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1", env = "RELAY_BIND_ADDR")]
    bind: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relay_agents=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AgentServiceConfig::from_env();
    let port = cli.port.unwrap_or_else(|| cli.kind.default_port());
    let addr: SocketAddr = format!("{}:{}", cli.bind, port).parse()?;

    let tools: Arc<dyn ToolInvoker> = Arc::new(McpToolAdapter::new());
    let agent: Arc<dyn TaskAgent> = match cli.kind {
        Kind::Article => {
            if config.bucket_name.is_none() {
                tracing::warn!(
                    "CLOUD_STORAGE_BUCKET_NAME not set; article tasks will fail with CONFIG_ERROR"
                );
            }
            Arc::new(ArticleDraftAgent::new(
                tools,
                &config.creative_llm_url,
                &config.cloud_storage_url,
                config.bucket_name.clone(),
            ))
        }
        Kind::Research => Arc::new(ResearchAgent::new(
            tools,
            &config.web_search_url,
            &config.creative_llm_url,
        )),
    };

    tracing::info!(
        agent = %agent.id(),
        result_url = %config.result_url,
        "Agent configured"
    );

    let reporter =
        Arc::new(HttpResultReporter::new(&config.result_url).with_timeout(config.result_timeout));
    let state = AgentState::new(TaskHandler::new(agent, reporter));

    serve(Arc::new(state), addr).await
}
