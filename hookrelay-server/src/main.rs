//! Hookrelay Server
//!
//! HTTP management API and producer entry point for the webhook dispatch
//! engine.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use config::runtime::DeliveryConfig;
use hookrelay_core::config::ConfigStore;
use hookrelay_core::framework::SubscriptionRegistry;
use hookrelay_core::processors::{Dispatcher, LogFailureNotifier};
use hookrelay_core::transport::ReqwestTransport;
use server::{build_router, run_server};
use shutdown::{shutdown_signal, spawn_config_reload_handler};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// How long the worker may take to finish its in-flight attempt on shutdown.
const WORKER_SHUTDOWN_GRACE: Duration = Duration::from_secs(35);

/// Hookrelay - event-driven webhook dispatch
#[derive(Parser, Debug)]
#[command(name = "hookrelay-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "HOOKRELAY_CONFIG", default_value = "./hookrelay.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long, env = "HOOKRELAY_LISTEN")]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting hookrelay-server v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let listen_addr = loaded_config.server.listen;
    let delivery_config = loaded_config.delivery;

    let transport = ReqwestTransport::new(&delivery_config.user_agent).map_err(|e| {
        tracing::error!("Failed to build HTTP client: {}", e);
        e
    })?;

    let registry = SubscriptionRegistry::new();
    let (dispatcher, worker) = Dispatcher::new(
        registry,
        Arc::new(transport),
        Arc::new(LogFailureNotifier),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = tokio::spawn(worker.run(shutdown_rx));

    let delivery_store = ConfigStore::new(delivery_config);
    spawn_restart_required_watcher(&delivery_store);

    let state = AppState::new(dispatcher, delivery_store, loaded_config.admin);
    let reload_notify = spawn_config_reload_handler(state.clone(), config_loader);

    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr, shutdown_signal()).await;

    reload_notify.notify_one();

    tracing::info!("Stopping delivery worker...");
    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(WORKER_SHUTDOWN_GRACE, worker_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Delivery worker panicked"),
        Err(_) => tracing::warn!("Delivery worker did not stop in time"),
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Warn when a reload changes settings that are only read at startup.
fn spawn_restart_required_watcher(store: &ConfigStore<DeliveryConfig>) {
    let initial = store.current();
    let mut watcher = store.subscribe();
    tokio::spawn(async move {
        while let Ok(latest) = watcher.changed().await {
            if latest.user_agent != initial.user_agent {
                tracing::warn!("delivery.user_agent changes take effect after restart");
            }
        }
    });
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hookrelay_core=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
