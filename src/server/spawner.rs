// src/server/spawner.rs

//! Spawns the long-lived background tasks the server depends on.

use super::context::ServerContext;
use tracing::warn;

/// Spawns every background task into the context's `JoinSet`.
pub fn spawn_all(ctx: &mut ServerContext) {
    match ctx.provider_events.take() {
        Some(events) => {
            let hub = ctx.hub.clone();
            let shutdown = ctx.shutdown.clone();
            ctx.background_tasks
                .spawn(hub.run_event_pump(events, shutdown));
        }
        None => warn!("Provider event pump already started."),
    }
}
