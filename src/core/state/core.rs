// src/core/state/core.rs

//! Defines `ServerState`, the immutable snapshot that is pushed to every client.

use super::location::LocationFix;
use strum_macros::{AsRefStr, Display, EnumString};

/// The lifecycle status reported to clients alongside each snapshot.
///
/// The upper-case names are part of the wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerStatus {
    /// The provider has never been started.
    #[default]
    Uninitialized,
    /// The provider has been started but has not produced a fix yet.
    AwaitingLocation,
    /// At least one fix has been received since the provider was started.
    TransmittingLocation,
    /// The provider was stopped after the last client left.
    LocationStopped,
}

/// A point-in-time view of everything the server tells its clients.
///
/// Instances are never mutated once published. The hub replaces the shared
/// `Arc<ServerState>` wholesale, so readers always see a consistent triple.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerState {
    pub status: ServerStatus,
    pub location: Option<LocationFix>,
    /// Number of satellites reported by the provider, `0` when unknown.
    pub satellites: u32,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with a different status, keeping the fix and satellite count.
    pub fn with_status(&self, status: ServerStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Returns a copy carrying `fix` with status `TRANSMITTING_LOCATION`.
    pub fn with_fix(&self, fix: LocationFix) -> Self {
        Self {
            status: ServerStatus::TransmittingLocation,
            location: Some(fix),
            satellites: self.satellites,
        }
    }

    /// Returns a copy with an updated satellite count only.
    pub fn with_satellites(&self, satellites: u32) -> Self {
        Self {
            satellites,
            ..self.clone()
        }
    }

    pub fn has_location(&self) -> bool {
        self.location.is_some()
    }
}
