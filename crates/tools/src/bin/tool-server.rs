//! Reference tool server binary.
//!
//! Usage:
//!   relay-tool-server --kind creative --port 8101
//!   relay-tool-server --kind search --config llm.toml
//!   relay-tool-server --kind storage --port 8103
//!
//! # Environment Variables
//!
//! - `ANTHROPIC_API_KEY` / `OPENAI_API_KEY` - LLM provider for `creative` and `search`
//! - `CLOUD_STORAGE_BUCKETS` - comma-separated buckets created at startup (default: `relay-articles`)
//! - `CLOUD_STORAGE_PUBLIC_URL` - base of returned public URLs (default: `http://<bind>:<port>/blobs`)

use clap::{Parser, ValueEnum};
use relay_llm::{LlmClient, LlmConfig, build_llm_client};
use relay_tools::{
    BlobStore, CloudStorageServer, CreativeLlmServer, ToolHandler, WebSearchServer, blob_routes,
    creative, search, serve, tool_router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Creative,
    Search,
    Storage,
}

impl Kind {
    fn default_port(self) -> u16 {
        match self {
            Kind::Creative => 8101,
            Kind::Search => 8102,
            Kind::Storage => 8103,
        }
    }
}

#[derive(Parser)]
#[command(name = "relay-tool-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reference tool server speaking the relay tool-call contract", long_about = None)]
struct Cli {
    /// Which tool server to run
    #[arg(short, long, value_enum)]
    kind: Kind,

    /// Port to listen on (defaults to 8101/8102/8103 by kind)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1", env = "RELAY_BIND_ADDR")]
    bind: String,

    /// LLM config file (TOML); overrides the API-key environment variables
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn load_llm(
    config_path: Option<&PathBuf>,
    anthropic_model: &str,
    openai_model: &str,
) -> anyhow::Result<Option<Arc<dyn LlmClient>>> {
    let config = match config_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            Some(toml::from_str::<LlmConfig>(&raw)?)
        }
        None => LlmConfig::from_env(anthropic_model, openai_model),
    };

    match config {
        Some(config) => {
            tracing::info!(provider = ?config.provider, model = %config.model, "LLM configured");
            Ok(Some(build_llm_client(&config)?))
        }
        None => {
            tracing::error!("No LLM API key set; tool calls will fail with LLM_NOT_INITIALIZED");
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relay_tools=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let port = cli.port.unwrap_or_else(|| cli.kind.default_port());
    let addr: SocketAddr = format!("{}:{}", cli.bind, port).parse()?;

    let router = match cli.kind {
        Kind::Creative => {
            let llm = load_llm(
                cli.config.as_ref(),
                creative::DEFAULT_ANTHROPIC_MODEL,
                creative::DEFAULT_OPENAI_MODEL,
            )?;
            tool_router(Arc::new(CreativeLlmServer::new(llm)) as Arc<dyn ToolHandler>)
        }
        Kind::Search => {
            let llm = load_llm(
                cli.config.as_ref(),
                search::DEFAULT_ANTHROPIC_MODEL,
                search::DEFAULT_OPENAI_MODEL,
            )?;
            tool_router(Arc::new(WebSearchServer::new(llm)) as Arc<dyn ToolHandler>)
        }
        Kind::Storage => {
            let buckets = std::env::var("CLOUD_STORAGE_BUCKETS")
                .unwrap_or_else(|_| "relay-articles".to_string());
            let store = Arc::new(BlobStore::with_buckets(
                buckets
                    .split(',')
                    .map(str::trim)
                    .filter(|b| !b.is_empty()),
            ));
            let public_url = std::env::var("CLOUD_STORAGE_PUBLIC_URL")
                .unwrap_or_else(|_| format!("http://{}/blobs", addr));
            tracing::info!(buckets = %buckets, public_url = %public_url, "Storage configured");

            let server = CloudStorageServer::new(store.clone(), public_url);
            tool_router(Arc::new(server) as Arc<dyn ToolHandler>).merge(blob_routes(store))
        }
    };

    serve(router, addr).await
}
