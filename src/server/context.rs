// src/server/context.rs

use crate::config::Config;
use crate::core::events::ProviderEvent;
use crate::core::hub::BroadcastHub;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Holds all the initialized state required to run the server's main loop.
pub struct ServerContext {
    pub config: Config,
    pub hub: Arc<BroadcastHub>,
    pub listener: TcpListener,
    pub shutdown: CancellationToken,
    /// Taken by the spawner when the hub's event pump starts.
    pub provider_events: Option<UnboundedReceiver<ProviderEvent>>,
    pub background_tasks: JoinSet<()>,
}

impl ServerContext {
    /// The address the listener is actually bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn hub(&self) -> Arc<BroadcastHub> {
        self.hub.clone()
    }

    /// A token that stops the server when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}
