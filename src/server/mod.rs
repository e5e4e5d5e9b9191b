// src/server/mod.rs

//! The TCP acceptor and the orchestration of server startup and shutdown.

use crate::config::Config;
use crate::core::GnssShareError;
use crate::core::provider::LocationProvider;
use crate::core::status::StatusListener;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod connection_loop;
mod context;
mod initialization;
mod spawner;

pub use context::ServerContext;

/// Creates the hub and binds the listening socket.
///
/// A bind failure is reported to `status` and returned; it is not retried.
pub async fn bind(
    config: Config,
    provider: Arc<dyn LocationProvider>,
    status: Arc<dyn StatusListener>,
) -> Result<ServerContext, GnssShareError> {
    initialization::setup(config, provider, status).await
}

/// Starts the hub's background tasks and accepts connections until the
/// context's shutdown token is cancelled.
pub async fn serve(mut ctx: ServerContext) -> Result<(), GnssShareError> {
    spawner::spawn_all(&mut ctx);
    connection_loop::run(ctx).await;
    Ok(())
}

/// The main server entry point: bind, then serve until SIGINT or SIGTERM.
pub async fn run(
    config: Config,
    provider: Arc<dyn LocationProvider>,
    status: Arc<dyn StatusListener>,
) -> Result<(), GnssShareError> {
    let ctx = bind(config, provider, status).await?;

    let shutdown = ctx.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!("Failed to listen for shutdown signals: {}", e);
        }
        shutdown.cancel();
    });

    serve(ctx).await
}

/// Resolves on the first SIGINT or SIGTERM.
async fn shutdown_signal() -> Result<(), GnssShareError> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => info!("SIGINT received, initiating graceful shutdown."),
        _ = sigterm.recv() => info!("SIGTERM received, initiating graceful shutdown."),
    }
    Ok(())
}
