// src/core/provider/mod.rs

//! The interface to the upstream location source, and the built-in providers.

pub mod simulated;

use crate::core::errors::ProviderError;
use crate::core::events::ProviderSink;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

pub use simulated::SimulatedProvider;

/// Which upstream positioning method a provider should use.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LocationSource {
    /// Satellite positioning only.
    #[default]
    Gps,
    /// Cell and Wi-Fi based positioning.
    Network,
    /// Whatever blend of sources the platform considers best.
    Fused,
}

impl LocationSource {
    /// Maps the numeric selector used by older front-ends (1 = GPS,
    /// 2 = network, 3 = fused). Unknown values fall back to network.
    pub fn from_selector(selector: u8) -> Self {
        match selector {
            1 => LocationSource::Gps,
            3 => LocationSource::Fused,
            _ => LocationSource::Network,
        }
    }
}

/// An upstream source of location fixes.
///
/// `start` and `stop` are called by the hub while it holds its state lock,
/// so both must return promptly: a provider does its real work on its own
/// task or thread and reports through the `ProviderSink`.
pub trait LocationProvider: Send + Sync {
    /// Begins delivering fixes and satellite counts to `sink`.
    ///
    /// Starting an already running provider must be a no-op.
    fn start(&self, source: LocationSource, sink: ProviderSink) -> Result<(), ProviderError>;

    /// Stops delivering events. Stopping an idle provider must be a no-op.
    fn stop(&self);
}
