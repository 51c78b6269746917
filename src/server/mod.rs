//! REST facade over the Alexa client.
//!
//! Every route maps to one client call; request tracing and graceful
//! shutdown are handled here, everything else lives in the handlers.

pub mod routes;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tracing::info;

use self::routes::{create_router, BridgeState};

/// Run the HTTP server until ctrl-c.
pub async fn run_server(port: u16, state: BridgeState) -> Result<()> {
    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down gracefully");
        })
        .await
        .context("HTTP server error")
}
