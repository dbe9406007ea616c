//! Axum HTTP server exposing record CRUD over arbitrary tables.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Authenticate every request against the access controller.
//! - Inject shared application state (`AppState`) into handlers.

pub mod handlers;
pub mod identity;
pub mod router;
pub mod state;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use state::{AppState, Controller};

/// Bind `0.0.0.0:port` and serve until the process is stopped.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(controller: Controller, port: u16, request_timeout: Duration) -> Result<()> {
    let router = router::build(AppState::new(controller), request_timeout);

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated with an error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
