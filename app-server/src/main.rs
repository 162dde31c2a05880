use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use warbook_server::{AppState, ServerConfig};

/// Rule-data API server.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file. Defaults to `<config dir>/warbook/config.toml` if present.
    #[arg(long, env = "WARBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, env = "WARBOOK_BIND")]
    bind: Option<SocketAddr>,

    /// Persist documents as JSON files under this directory.
    #[arg(long, env = "WARBOOK_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = ServerConfig::discover(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config = config.with_bind(bind);
    }
    if let Some(data_dir) = cli.data_dir {
        config = config.with_data_dir(data_dir);
    }

    let state = AppState::open(config)
        .await
        .context("failed to initialize server state")?;
    warbook_server::serve(state).await.context("server error")?;
    Ok(())
}
