mod config;
mod handler;
mod logging;
mod metrics;

use anyhow::Result;
use clap::Parser;

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::config::{ProxyConfig, ServerConfig};
use crate::handler::state::ProxyState;

#[derive(Parser, Debug)]
#[command(version, about)]
pub(crate) struct Args {
    /// TOML file with server settings. Defaults apply when omitted.
    #[arg(long)]
    config_file: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long, action)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(&args)?;

    let config = ServerConfig::load(args.config_file.as_deref())?;
    let routes = ProxyConfig::from_env()?;

    let metrics_socket_addr = SocketAddr::new(config.bind_address, config.metrics_port);
    metrics::init(metrics_socket_addr)?;

    let state = ProxyState::new(&config, routes)?;

    let proxy_socket_addr = SocketAddr::new(config.bind_address, config.proxy_port);
    let listener = tokio::net::TcpListener::bind(proxy_socket_addr).await?;

    tracing::info!("Starting server on {proxy_socket_addr}...");

    handler::serve(listener, state, shutdown_signal()).await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(?error, "Couldn't listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(?error, "Couldn't listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
