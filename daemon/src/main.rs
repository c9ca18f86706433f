//! stakequiz daemon — entry point for running the verification service.

mod config;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use std::path::PathBuf;

use stakequiz_ledger::SolanaRpcClient;
use stakequiz_pipeline::VerificationPipeline;
use stakequiz_queue::{HttpQueueClient, RetryPolicy};
use stakequiz_rpc::{router, AppState, RpcServer};
use stakequiz_store_lmdb::LmdbStakeStore;

pub use config::ServiceConfig;
pub use error::DaemonError;

#[derive(Parser)]
#[command(name = "stakequiz-daemon", about = "Stake verification and quiz service")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings are
    /// used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data directory for LMDB storage.
    #[arg(long, env = "STAKEQUIZ_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Port for the HTTP API.
    #[arg(long, env = "STAKEQUIZ_HTTP_PORT")]
    http_port: Option<u16>,

    /// Solana JSON-RPC endpoint.
    #[arg(long, env = "STAKEQUIZ_SOLANA_RPC_URL")]
    solana_rpc_url: Option<String>,

    /// Base URL of the job queue.
    #[arg(long, env = "STAKEQUIZ_QUEUE_URL")]
    queue_url: Option<String>,

    /// Bearer token for the queue API.
    #[arg(long, env = "STAKEQUIZ_QUEUE_TOKEN")]
    queue_token: Option<String>,

    /// Public URL of this service's /jobs/verify endpoint.
    #[arg(long, env = "STAKEQUIZ_CONSUMER_URL")]
    consumer_url: Option<String>,

    /// Emit logs as JSON instead of human-readable lines.
    #[arg(long, env = "STAKEQUIZ_LOG_JSON")]
    log_json: bool,
}

fn load_config(cli: &Cli) -> Result<ServiceConfig, DaemonError> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_toml_file(path)?,
        None => ServiceConfig::default(),
    };

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(port) = cli.http_port {
        config.http_port = port;
    }
    if let Some(url) = &cli.solana_rpc_url {
        config.solana_rpc_url = url.clone();
    }
    if let Some(url) = &cli.queue_url {
        config.queue_url = url.clone();
    }
    if let Some(token) = &cli.queue_token {
        config.queue_token = token.clone();
    }
    if let Some(url) = &cli.consumer_url {
        config.consumer_url = url.clone();
    }
    if cli.log_json {
        config.log_format = "json".to_string();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    stakequiz_utils::init_tracing(config.log_format == "json");

    if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "loaded config file");
    }

    std::fs::create_dir_all(&config.data_dir)?;
    let store = Arc::new(LmdbStakeStore::open(
        &config.data_dir,
        config.map_size_bytes(),
    )?);

    let ledger = Arc::new(SolanaRpcClient::new(
        config.solana_rpc_url.clone(),
        Duration::from_secs(config.ledger_timeout_secs),
    )?);

    let queue = Arc::new(HttpQueueClient::new(
        config.queue_url.clone(),
        config.queue_token.clone(),
        config.consumer_url.clone(),
        Duration::from_secs(10),
    )?);

    let pipeline = Arc::new(VerificationPipeline::new(
        store.clone(),
        ledger.clone(),
        config.stake.clone(),
    ));

    let state = AppState {
        store,
        queue,
        pipeline,
        retry_policy: RetryPolicy {
            retries: config.queue_retries,
            initial_delay: Duration::from_secs(config.queue_initial_delay_secs),
        },
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!(
        %addr,
        data_dir = %config.data_dir.display(),
        solana_rpc = %config.solana_rpc_url,
        "starting stakequiz service"
    );
    RpcServer::new(addr).start(router(state)).await?;
    Ok(())
}
