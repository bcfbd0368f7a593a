use anyhow::{Context, Result};
use clap::Parser;
use showroom_application::Dispatcher;
use showroom_core::config::GatewayConfig;
use showroom_interaction::build_client;
use showroom_interaction::config::resolve_api_key;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

mod telemetry;
mod ws;

#[derive(Parser, Debug)]
#[command(name = "showroom")]
#[command(about = "Showroom - dialogue gateway for the furnishing game", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.config/showroom/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding [server] listen
    #[arg(long)]
    listen: Option<String>,

    /// Log filter directive, e.g. "debug" or "showroom_application=trace"
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_level.as_deref())?;

    let config =
        GatewayConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let api_key = resolve_api_key(config.backend.provider)
        .context("no API key configured for the selected backend")?;

    let client = build_client(&config, &api_key);
    let state = Arc::new(ws::GatewayState {
        dispatcher: Dispatcher::new(client, config.prompts.clone()),
        max_turn_pairs: config.session.max_turn_pairs,
    });

    let listen = cli.listen.unwrap_or(config.server.listen);
    let listener = TcpListener::bind(&listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    tracing::info!("[Gateway] Listening on ws://{}/ws", listener.local_addr()?);

    axum::serve(listener, ws::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("[Gateway] Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("[Gateway] Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}
