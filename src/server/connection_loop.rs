// src/server/connection_loop.rs

//! Contains the main server loop for accepting connections and handling graceful shutdown.

use super::context::ServerContext;
use crate::connection::{ClientSession, ConnectionHandler};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

const SHUTDOWN_WAIT: Duration = Duration::from_secs(10);

/// The main server loop that accepts connections and handles graceful shutdown.
pub async fn run(ctx: ServerContext) {
    let ServerContext {
        config,
        hub,
        listener,
        shutdown,
        mut background_tasks,
        ..
    } = ctx;

    let mut session_id_counter: u64 = 0;
    let mut client_tasks = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("Shutdown requested, no longer accepting connections.");
                break;
            }

            Some(res) = background_tasks.join_next() => {
                match res {
                    Ok(()) => error!("CRITICAL: A background task finished unexpectedly. Shutting down."),
                    Err(e) => error!("CRITICAL: Background task panicked: {e:?}. Shutting down."),
                }
                break;
            }

            res = listener.accept() => {
                match res {
                    Ok((socket, addr)) => {
                        info!("Accepted new connection from: {}", addr);
                        session_id_counter = session_id_counter.wrapping_add(1);

                        let (session, outbox) = ClientSession::new(session_id_counter, addr);
                        if !hub.register(session.clone()) {
                            continue;
                        }
                        let handler = ConnectionHandler::from_tcp(
                            socket,
                            session,
                            outbox,
                            hub.clone(),
                            config.heartbeat.clone(),
                        );
                        client_tasks.spawn(async move {
                            if let Err(e) = handler.run().await {
                                if e.is_normal_disconnect() {
                                    debug!("Connection from {} closed: {}", addr, e);
                                } else {
                                    warn!("Connection from {} terminated: {}", addr, e);
                                }
                            }
                        });
                    }
                    Err(e) if shutdown.is_cancelled() => {
                        debug!("Accept error during shutdown ignored: {}", e);
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                }
            }

            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("A client handler panicked: {e:?}");
                }
            }
        }
    }

    drop(listener);
    shutdown.cancel();
    info!("Shutting down. Disconnecting all clients.");
    hub.shutdown();

    if tokio::time::timeout(SHUTDOWN_WAIT, async {
        while client_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for client connections to close; aborting them.");
        client_tasks.shutdown().await;
    }
    info!("All client connections closed.");

    info!("Waiting for background tasks to finish...");
    if tokio::time::timeout(SHUTDOWN_WAIT, async {
        while background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
    }
    info!("Server shutdown complete.");
}
