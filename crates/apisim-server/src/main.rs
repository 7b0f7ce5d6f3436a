//! # apisim-server
//!
//! HTTP server simulating the Slack Web API and Events API on top of SQLite.
//!
//! This binary provides:
//! - Web API methods under `/api/<method>` (conversations, chat, reactions, users, team, auth)
//! - The Events API request URL at `/api/events`
//! - Its own OpenAPI document at `/api/openapi.json`
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package apisim-server
//!
//! # Custom port, fresh database
//! APISIM_SERVER__PORT=8080 APISIM_DATABASE__RESET_ON_START=true ./apisim-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use anyhow::Context;
use apisim_core::{AppConfig, SampleOptions, Store};
use apisim_server::api::{create_router, web_api_method_names};
use apisim_server::logging;
use apisim_server::state::SharedState;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    logging::init(&config.logging)?;

    info!("Starting apisim-server v{}", env!("CARGO_PKG_VERSION"));

    let store = open_store(&config)?;
    let addr = config.server.bind_address();
    let state = SharedState::new(config, store);
    let app = create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!("Listening on http://{addr}");
    log_endpoints();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Open the database, applying the reset and sample data settings.
fn open_store(config: &AppConfig) -> anyhow::Result<Store> {
    let path = &config.database.path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
    }

    let store = Store::open(path).with_context(|| format!("opening {}", path.display()))?;
    info!(path = %path.display(), "Database opened");

    if config.database.reset_on_start {
        store.reset()?;
    }

    if config.database.populate_sample_data && store.is_empty()? {
        let options = SampleOptions {
            seed: config.database.sample_seed,
            ..SampleOptions::default()
        };
        let summary = store.populate_sample_data(&options)?;
        info!(
            users = summary.users,
            channels = summary.channels,
            messages = summary.messages,
            "Sample data populated"
        );
    }

    match store.health_check() {
        Ok(()) => {
            let counts = store.counts()?;
            info!(?counts, "Database healthy");
        }
        Err(e) => warn!("Database health check failed: {e}"),
    }

    Ok(store)
}

fn log_endpoints() {
    info!("  GET  /health");
    info!("  GET  /api/test");
    info!("  GET  /api/openapi.json");
    info!("  POST /api/events");
    for name in web_api_method_names() {
        info!("  GET|POST /api/{name}");
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
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

    info!("Shutdown signal received");
}
