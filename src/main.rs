//! alexa-bridge - a REST facade over the Alexa cloud API.
//!
//! Exposes a small set of HTTP endpoints for listing devices, sending
//! sequence commands, speaking text, and querying account data, with the
//! session cookie persisted to disk so restarts do not require a new
//! sign-in. The browser login flow itself is handled by an external
//! helper; `/reconnect` redirects there when a fresh cookie is needed.

mod alexa;
mod config;
mod models;
mod server;
mod session;
mod utils;

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use session::{SessionManager, SessionStore};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    info!("alexa-bridge starting");

    // An explicit config path may be given as the first CLI argument
    let args: Vec<String> = std::env::args().collect();
    let config_path = args.get(1).map(Path::new);
    let config = Config::load(config_path).context("Failed to load configuration")?;

    let state_dir = config.state_dir()?;
    let store = SessionStore::new(state_dir).context("Failed to prepare state directory")?;

    let port = config.http_port;
    let manager = SessionManager::new(config, store);

    // Connect eagerly when a cookie is stored so restarts pick up the
    // previous session; otherwise the server waits for /reconnect
    if manager.has_stored_cookie() {
        if let Err(e) = manager.connect().await {
            warn!(error = %e, "Initial connect failed, call /reconnect");
        }
    } else {
        info!("No stored session cookie, call /reconnect to sign in");
    }

    server::run_server(port, manager).await
}
