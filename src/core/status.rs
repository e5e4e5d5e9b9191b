// src/core/status.rs

//! The presentation seam: how the server reports its state to whatever is
//! rendering it (a tray icon, a notification, or just the log).

use crate::core::state::ServerState;
use std::fmt;
use tracing::{error, info};

/// Receives server state changes. All methods default to no-ops.
///
/// Calls are made outside the hub's lock, possibly from several tasks at
/// once, so implementations must be cheap and thread-safe.
pub trait StatusListener: Send + Sync {
    /// The number of connected clients changed.
    fn on_membership_changed(&self, _count: usize) {}

    /// The published snapshot changed (status, fix or satellite count).
    fn on_state_changed(&self, _state: &ServerState) {}

    /// The server or the location provider failed to start.
    fn on_start_failed(&self, _message: &str) {}
}

/// A human-readable summary of the server, equivalent to a status notification.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub clients: usize,
    pub provider_active: bool,
    pub satellites: u32,
    /// Age of the current fix in seconds, if one is known.
    pub fix_age_secs: Option<f64>,
    /// Set when the server could not start; replaces the rest of the text.
    pub start_error: Option<String>,
}

impl StatusReport {
    /// Builds a report from a snapshot as seen at `now_millis`.
    pub fn from_state(
        state: &ServerState,
        clients: usize,
        provider_active: bool,
        now_millis: i64,
    ) -> Self {
        Self {
            clients,
            provider_active,
            satellites: state.satellites,
            fix_age_secs: state
                .location
                .as_ref()
                .map(|fix| (now_millis - fix.timestamp) as f64 / 1000.0),
            start_error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            clients: 0,
            provider_active: false,
            satellites: 0,
            fix_age_secs: None,
            start_error: Some(message.into()),
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(err) = &self.start_error {
            return write!(f, "Server failed to start: {err}");
        }

        if self.clients == 0 {
            write!(f, "No clients connected")?;
        } else {
            write!(f, "Clients connected: {}", self.clients)?;
        }
        f.write_str(" | ")?;

        if !self.provider_active {
            return f.write_str("GNSS inactive");
        }
        write!(f, "Satellites: {}", self.satellites)?;
        if let Some(age) = self.fix_age_secs {
            write!(f, " | Location age: {age:.1}s")?;
        }
        Ok(())
    }
}

/// Renders state changes into the log, standing in for a status notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatusListener;

impl StatusListener for LogStatusListener {
    fn on_membership_changed(&self, count: usize) {
        info!(clients = count, "Client membership changed.");
    }

    fn on_state_changed(&self, state: &ServerState) {
        info!(
            status = %state.status,
            satellites = state.satellites,
            has_fix = state.has_location(),
            "Server state changed."
        );
    }

    fn on_start_failed(&self, message: &str) {
        error!("{}", StatusReport::failed(message));
    }
}
