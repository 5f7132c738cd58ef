//! crash-operator: round coordinator and admin API for the crash game program

use clap::Parser;
use crash_operator::{
    api::ApiServer,
    chain::{ChainClient, InMemoryChain, SolanaChainClient},
    config::{self, ChainMode, ConfigLoader, GameDefaults},
    coordinator::{Coordinator, RoundLoop},
    errors::ControlResult,
    games::GameConfig,
};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crash-operator")]
#[command(about = "Round coordinator and admin API for the crash game program")]
#[command(version)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the admin API port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the chain backend: rpc or memory
    #[arg(long)]
    chain_mode: Option<ChainMode>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "crash_operator=debug,tower_http=debug"
    } else {
        "crash_operator=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .init();

    let loader = match &cli.config {
        Some(path) => ConfigLoader::new().with_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;
    if let Some(port) = cli.port {
        config.api.port = port;
    }
    if let Some(mode) = cli.chain_mode {
        config.chain.mode = mode;
    }
    config::validate(&config)?;
    info!("🚀 Starting crash operator ({:?} chain)", config.chain.mode);

    let chain: Arc<dyn ChainClient> = match config.chain.mode {
        ChainMode::Rpc => Arc::new(SolanaChainClient::from_config(&config.chain)?),
        ChainMode::Memory => {
            warn!("Using the in-memory chain; nothing is submitted to a cluster");
            Arc::new(InMemoryChain::new())
        }
    };
    let coordinator = Arc::new(Coordinator::new(chain, config.chain.submit_timeout()));

    let game_config = tokio::select! {
        result = bootstrap(&coordinator, &config.game, config.rounds.retry_backoff()) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted during bootstrap");
            return Ok(());
        }
    };
    info!(
        "Game config: houseEdge={}%, min={}, max={}, completed={}",
        game_config.house_edge_percent,
        game_config.min_bet,
        game_config.max_bet,
        game_config.total_games_completed
    );

    let shutdown = CancellationToken::new();
    let round_loop = RoundLoop::new(coordinator.clone(), config.rounds.clone(), shutdown.clone()).spawn();

    let result = ApiServer::new(config.api.clone(), coordinator, shutdown.clone())
        .run()
        .await;

    shutdown.cancel();
    if let Err(e) = round_loop.await {
        error!("Round loop task failed: {}", e);
    }
    result
}

/// Retry transient bootstrap failures until the program is ready
async fn bootstrap(
    coordinator: &Coordinator,
    defaults: &GameDefaults,
    backoff: Duration,
) -> ControlResult<GameConfig> {
    loop {
        match coordinator.ensure_initialized(defaults).await {
            Ok(config) => return Ok(config),
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "Bootstrap failed, retrying in {}ms", backoff.as_millis());
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}
