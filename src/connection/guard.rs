// src/connection/guard.rs

//! Defines `SessionGuard`, an RAII guard for session teardown.

use super::session::ClientSession;
use crate::core::hub::BroadcastHub;
use std::sync::Arc;
use tracing::debug;

/// Ensures a session is closed and removed from the hub however its worker
/// exits, including when the worker task is aborted.
pub struct SessionGuard {
    hub: Arc<BroadcastHub>,
    session: Arc<ClientSession>,
}

impl SessionGuard {
    pub(crate) fn new(hub: Arc<BroadcastHub>, session: Arc<ClientSession>) -> Self {
        Self { hub, session }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        debug!(
            "SessionGuard dropping, cleaning up session {} ({})",
            self.session.id(),
            self.session.addr()
        );
        self.session.disconnect();
        self.hub.deregister(self.session.id());
    }
}
