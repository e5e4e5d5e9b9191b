// src/core/mod.rs

//! The central module containing the core logic and data structures of the
//! broadcast server.

pub mod errors;
pub mod events;
pub mod hub;
pub mod protocol;
pub mod provider;
pub mod state;
pub mod status;

pub use errors::GnssShareError;
