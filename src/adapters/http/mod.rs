//! HTTP Control Surface - axum 0.7
//!
//! Manual iteration triggers, intent index maintenance, cached state
//! read-back, health probes and Prometheus metrics on one listener.

pub mod error;
pub mod routes;

use axum::Router;
use tokio::sync::broadcast;
use tracing::{info, instrument};

pub use error::ApiError;
pub use routes::{router, AppState};

/// Serve `app` on `bind_address` until the shutdown signal.
#[instrument(skip(app, shutdown_rx))]
pub async fn serve(
    app: Router,
    bind_address: String,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "Control surface listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    Ok(())
}
