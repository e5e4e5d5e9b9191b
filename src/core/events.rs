// src/core/events.rs

//! Defines the event channel that carries provider callbacks onto the hub's
//! update path.
//!
//! Providers run on their own schedule and in their own context. They never
//! touch hub state directly; they push `ProviderEvent`s into a `ProviderSink`
//! and the hub's event pump applies them.

use crate::core::state::LocationFix;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// A single callback from a location provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// A fresh position fix.
    Fix(LocationFix),
    /// The number of satellites currently seen by the receiver.
    SatelliteCount(u32),
}

/// The narrow callback interface handed to a provider when it is started.
///
/// Sending never blocks, so it is safe to call from any thread, including
/// threads that are not part of the Tokio runtime.
#[derive(Debug, Clone)]
pub struct ProviderSink {
    tx: UnboundedSender<ProviderEvent>,
}

impl ProviderSink {
    /// Creates a sink and the receiver the hub's event pump reads from.
    pub fn channel() -> (Self, UnboundedReceiver<ProviderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Delivers a fix. Returns `false` if the hub is gone.
    pub fn on_fix(&self, fix: LocationFix) -> bool {
        self.send(ProviderEvent::Fix(fix))
    }

    /// Delivers a satellite count. Returns `false` if the hub is gone.
    pub fn on_satellite_count(&self, count: u32) -> bool {
        self.send(ProviderEvent::SatelliteCount(count))
    }

    /// True once the receiving side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, event: ProviderEvent) -> bool {
        if self.tx.send(event).is_err() {
            debug!("Provider event dropped: hub event pump is gone.");
            return false;
        }
        true
    }
}
