//! mapkv Server Binary
//!
//! Opens the store at `store.db` in the working directory and serves the
//! line protocol on the default port. Takes no flags; `RUST_LOG` controls
//! log verbosity.

use std::sync::Arc;

use mapkv::network::Server;
use mapkv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mapkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let config = Config::default();

    tracing::info!("mapkv Server v{}", mapkv::VERSION);
    tracing::info!("Store file: {}", config.db_path.display());
    tracing::info!("Listen address: {}", config.listen_addr);

    // Open engine
    let engine = match Engine::open(&config.db_path) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    // Start server
    let mut server = match Server::bind(config, engine) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
