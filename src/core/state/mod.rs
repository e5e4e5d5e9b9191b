// src/core/state/mod.rs

//! Defines the broadcast snapshot (`ServerState`) and the location fix it carries.

mod core;
mod location;

pub use core::{ServerState, ServerStatus};
pub use location::LocationFix;
