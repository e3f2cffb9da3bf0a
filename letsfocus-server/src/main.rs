//! Let's Focus task server.
//!
//! Serves the task API over HTTP. Tasks live in memory and, when a data
//! file is configured, are snapshotted to disk after every change.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:8080, memory only
//! cargo run --bin letsfocus-server -- --session dev-token:alice
//!
//! # Persist tasks and bind elsewhere
//! cargo run --bin letsfocus-server -- --bind 127.0.0.1:3000 --data-file tasks.bin
//!
//! # Or via environment variables
//! LETSFOCUS_ADDR=127.0.0.1:3000 LETSFOCUS_DATA_FILE=tasks.bin cargo run --bin letsfocus-server
//! ```

use std::sync::Arc;

use clap::Parser;
use letsfocus_server::auth::SessionRegistry;
use letsfocus_server::config::{ServerCliArgs, ServerConfig};
use letsfocus_server::server::{self, AppState};
use letsfocus_server::store::TaskStore;

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting letsfocus task server");

    let store = match &config.data_file {
        Some(path) => match TaskStore::open(path).await {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(error = %e, "failed to open task store");
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("no data file configured, tasks will not survive a restart");
            TaskStore::new()
        }
    };

    let sessions = SessionRegistry::from_entries(&config.sessions);
    if sessions.is_empty() {
        tracing::warn!("no sessions configured, every API request will be rejected");
    } else {
        tracing::info!(sessions = sessions.len(), "sessions loaded");
    }

    let state = Arc::new(AppState::new(store, sessions).with_ordering(config.ordering));

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "task server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "task server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start task server");
            std::process::exit(1);
        }
    }
}
