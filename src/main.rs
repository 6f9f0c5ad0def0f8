//! ==============================================================================
//! main.rs - sensor hub entry point
//! ==============================================================================
//!
//! purpose:
//!     polls the open-meteo forecast api for the current temperature, keeps a
//!     capped history of readings in a json file, and serves that history over
//!     a small authenticated http api.
//!
//! responsibilities:
//!     - load configuration and start logging
//!     - build the shared history store and the weather provider
//!     - serve the read api in the background
//!     - run the polling loop until ctrl-c
//!
//! relationships:
//!     - uses: config.rs (host.toml), store.rs (history file),
//!       provider.rs (weather call), fetcher.rs (polling loop),
//!       api.rs + auth.rs (read api)
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────────┐
//!     │                  sensor hub (this file)                   │
//!     │  ┌─────────────┐                    ┌─────────────────┐  │
//!     │  │ poll loop   │                    │ web server      │  │
//!     │  │ (30s cycle) │                    │ (port 3000)     │  │
//!     │  └──────┬──────┘                    └────────┬────────┘  │
//!     │         │ append                       load  │           │
//!     │         └──────────────┐   ┌─────────────────┘           │
//!     │                  ┌─────┴───┴─────┐                       │
//!     │                  │ HistoryStore  │ <- store.rs            │
//!     │                  └───────┬───────┘                       │
//!     └──────────────────────────┼───────────────────────────────┘
//!                                ▼
//!                       data/history.json
//!
//! ==============================================================================

mod api;
mod auth;
mod config;
mod domain;
mod error;
mod fetcher;
mod provider;
mod store;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigSource, HostConfig};
use crate::store::HistoryStore;

// ==============================================================================
// main entry point
// ==============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration
    let loaded = HostConfig::load_or_default();
    let config = loaded.config;

    // step 2: logging (RUST_LOG wins over logging.level)
    init_tracing(&config.logging.level);
    for (path, reason) in &loaded.skipped {
        tracing::warn!(path = %path.display(), %reason, "failed to load configuration file");
    }
    match &loaded.source {
        ConfigSource::File(path) => tracing::info!(path = %path.display(), "loaded configuration"),
        ConfigSource::Defaults => tracing::warn!("no usable config file found, using defaults"),
    }
    config.validate()?;
    config.log_summary();

    // step 3: shared history store
    let file_store = store::JsonFileStore::new(config.storage.path.clone(), config.storage.max_entries);
    tracing::info!(path = %file_store.path().display(), "using history file");
    let store: Arc<dyn HistoryStore> = Arc::new(file_store);

    // step 4: the web server in background
    let state = api::ApiState {
        store: store.clone(),
        tokens: Arc::new(auth::TokenRegistry::from_entries(&config.auth.tokens)),
    };
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!(addr = %listener.local_addr()?, "sensor api listening");
    let server = tokio::spawn(api::serve(listener, state, shutdown_signal()));

    // step 5: polling loop
    let provider = provider::OpenMeteoProvider::new(&config.provider)
        .context("failed to build weather provider client")?;
    let fetcher = fetcher::Fetcher::new(Arc::new(provider), store, config.logging.show_readings);

    tokio::select! {
        _ = fetcher.run(config.poll_interval()) => {}
        _ = shutdown_signal() => tracing::info!("shutdown requested, stopping polling"),
    }

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "web server error"),
        Err(e) => tracing::error!(error = %e, "web server task failed"),
    }
    Ok(())
}

/// Initialize structured logging with tracing.
/// Respects RUST_LOG; otherwise `sensor_hub=<level>`.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sensor_hub={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
