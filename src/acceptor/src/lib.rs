pub mod handler;

pub use handler::remote_write_handler::{RemoteWriteState, handle_remote_write};

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use tokio::sync::oneshot;

/// Build the HTTP surface: the remote-write endpoint plus a liveness probe.
pub fn create_router(state: RemoteWriteState) -> Router {
    Router::new()
        .route("/api/v1/write", post(handle_remote_write))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

/// Serve the router until the shutdown signal fires.
pub async fn serve_http(
    addr: SocketAddr,
    state: RemoteWriteState,
    shutdown: oneshot::Receiver<()>,
) -> Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening for remote-write requests on {addr}");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            shutdown.await.ok();
            tracing::info!("HTTP server shutting down gracefully");
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}
