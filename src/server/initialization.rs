// src/server/initialization.rs

//! Handles server initialization: hub construction and listener binding.

use super::context::ServerContext;
use crate::config::Config;
use crate::core::GnssShareError;
use crate::core::hub::{BroadcastHub, HubSettings};
use crate::core::provider::LocationProvider;
use crate::core::status::StatusListener;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Initializes all server components before starting the main loop.
pub async fn setup(
    config: Config,
    provider: Arc<dyn LocationProvider>,
    status: Arc<dyn StatusListener>,
) -> Result<ServerContext, GnssShareError> {
    log_startup_info(&config);

    let addr = config.listen_addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            let err = GnssShareError::Bind {
                addr,
                source: Arc::new(e),
            };
            error!("{}", err);
            status.on_start_failed(&err.to_string());
            return Err(err);
        }
    };
    info!("gnss-share server listening on {}", listener.local_addr()?);

    let (hub, provider_events) =
        BroadcastHub::new(provider, status, HubSettings::from_config(&config));
    info!("Broadcast hub initialized.");

    Ok(ServerContext {
        config,
        hub,
        listener,
        shutdown: CancellationToken::new(),
        provider_events: Some(provider_events),
        background_tasks: JoinSet::new(),
    })
}

fn log_startup_info(config: &Config) {
    info!("Starting gnss-share v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Location source: {}, provider stop grace: {:?}",
        config.source, config.provider_stop_grace
    );
    info!(
        "Heartbeat: read timeout {:?}, timeout {:?}, response interval {:?}",
        config.heartbeat.read_timeout, config.heartbeat.timeout, config.heartbeat.response_interval
    );
}
