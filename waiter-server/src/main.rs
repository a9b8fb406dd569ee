//! Waiter server - diagnostic HTTP endpoint that holds connections open.
//!
//! `GET /delay?timeout=N` keeps the response pending for up to N seconds,
//! checking once per second that the client is still connected, and reports
//! how long it actually waited.

mod probe;
mod routes;
mod sse;
mod state;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use waiter::io::config::{ServerConfig, load_config, write_config};
use waiter::logging;

use crate::probe::{PeerInfo, ProbedListener};
use crate::state::{AppState, local_hostname};

#[derive(Parser)]
#[command(name = "waiter-server")]
#[command(about = "Diagnostic HTTP server that holds responses open for a requested time")]
struct Args {
    /// Path to the TOML config file (defaults apply if it does not exist)
    #[arg(long, default_value = "waiter.toml")]
    config: PathBuf,

    /// Address to bind the server to
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Largest accepted `timeout` for /delay, in seconds
    #[arg(long)]
    max_timeout_secs: Option<u64>,

    /// Write the effective settings to the config file and exit
    #[arg(long)]
    write_config: bool,
}

/// Load the config file and apply command-line overrides.
fn load_settings(args: &Args) -> Result<ServerConfig> {
    let mut config = load_config(&args.config).context("load server config")?;
    if let Some(bind) = &args.bind {
        config.bind = bind.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(max_timeout_secs) = args.max_timeout_secs {
        config.max_timeout_secs = max_timeout_secs;
    }
    config.validate()?;
    Ok(config)
}

/// Persist the effective settings to `--config`.
fn save_settings(args: &Args) -> Result<ServerConfig> {
    let config = load_settings(args)?;
    write_config(&args.config, &config)
        .with_context(|| format!("write {}", args.config.display()))?;
    Ok(config)
}

fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::router()
        .route("/events", get(sse::events_handler))
        .layer(cors)
        .with_state(state)
}

/// Serve `app` until `shutdown` is cancelled, then drain open connections.
async fn serve(
    listener: ProbedListener,
    app: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, app.into_make_service_with_connect_info::<PeerInfo>())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        return;
    }
    info!("shutdown requested, cancelling in-flight waits");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("waiter=info,waiter_server=info");

    let args = Args::parse();
    if args.write_config {
        let config = save_settings(&args)?;
        info!(path = %args.config.display(), port = config.port, "wrote config");
        return Ok(());
    }
    let config = load_settings(&args)?;

    let listener = TcpListener::bind((config.bind.as_str(), config.port))
        .await
        .with_context(|| format!("bind {}:{}", config.bind, config.port))?;
    let addr = listener.local_addr().context("read listener address")?;

    let state = AppState::new(config, local_hostname());
    info!(addr = %addr, hostname = %state.hostname, "listening");

    tokio::spawn(cancel_on_ctrl_c(state.shutdown.clone()));

    let app = build_app(state.clone());
    serve(ProbedListener::new(listener), app, state.shutdown.clone())
        .await
        .context("serve http")?;

    info!("server stopped");
    Ok(())
}
