//! Relay coordinator server binary.
//!
//! Usage:
//!   relay-coordinator
//!   relay-coordinator --config coordinator.toml --port 8000
//!
//! # Environment Variables
//!
//! - `RELAY_BIND_ADDR` - Server bind address (default: 127.0.0.1)
//! - `ARTICLE_DRAFT_AGENT_URL` - article agent `/message` endpoint
//! - `RESEARCHER_AGENT_URL` - research agent `/message` endpoint
//! - `RELAY_DISPATCH_TIMEOUT_MS` - assignment send timeout (default: 5000)

use clap::Parser;
use relay_api::{AppState, serve};
use relay_coordinator::CoordinatorConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "relay-coordinator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Relay task coordinator", long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1", env = "RELAY_BIND_ADDR")]
    bind: String,

    /// Path to a coordinator TOML config
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relay_api=debug,relay_coordinator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if cli.bind == "0.0.0.0" {
        tracing::warn!(
            "Coordinator binding to 0.0.0.0; there is no authentication between services."
        );
    }

    let config = match &cli.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading configuration");
            CoordinatorConfig::from_file(path)?
        }
        None => {
            tracing::info!("Using default configuration");
            CoordinatorConfig::default()
        }
    }
    .with_env_overrides();

    for (kind, route) in &config.routes {
        tracing::info!(kind = %kind, agent = %route.agent_id, endpoint = %route.endpoint, "Route");
    }

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;
    serve(Arc::new(AppState::new(config)), addr).await
}
