//! uplift daemon
//!
//! Middleware upgrade orchestration over an axum HTTP server and a kameo engine actor

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use eyre::WrapErr;
use kameo::actor::Spawn;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use uplift_core::{UpgradeEngine, UpgradeEngineArgs};

mod api;
mod config;
mod factory;
mod router;
mod state;

use crate::config::{Config, DaemonConfig};
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "uplift", version, about = "Middleware upgrade orchestration daemon")]
struct Args {
    /// Path to uplift.toml
    #[arg(short, long, env = "UPLIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind address
    #[arg(long)]
    bind: Option<String>,
}

fn init_tracing(daemon: &DaemonConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&daemon.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if daemon.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let mut config = Config::load_default(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }
    init_tracing(&config.daemon);

    let inventory = factory::seed_inventory(&config.host).await?;
    let audit_store = factory::build_audit_store(&config.daemon).await?;
    let executor = factory::build_executor(&config.automation)?;

    let (event_tx, _) = broadcast::channel(config.daemon.event_channel_capacity);
    let engine = UpgradeEngine::spawn(UpgradeEngineArgs {
        inventory,
        audit_store,
        executor,
        event_tx: event_tx.clone(),
        max_output_bytes: config.automation.max_output_bytes,
    });

    let bind = config.daemon.bind.clone();
    let state = Arc::new(AppState::new(engine.clone(), event_tx));
    let app = router::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .wrap_err_with(|| format!("failed to bind {bind}"))?;
    tracing::info!(%bind, "uplift daemon listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("http server failed")?;

    tracing::info!("shutting down");
    if let Err(e) = engine.stop_gracefully().await {
        tracing::warn!(error = %e, "engine already stopped");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}
