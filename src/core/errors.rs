// src/core/errors.rs

//! Defines the primary error types for the broadcast server.

use std::string::FromUtf8Error;
use std::sync::Arc;
use thiserror::Error;

/// Failures reported by a location provider when asked to start.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The host refused access to location data. The provider stays inactive
    /// and is not retried until the next client connects.
    #[error("location permission denied: {0}")]
    PermissionDenied(String),

    #[error("location source unavailable: {0}")]
    Unavailable(String),
}

/// The main error enum, representing all failures within the server.
#[derive(Error, Debug)]
pub enum GnssShareError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    /// The listening socket could not be bound. Fatal for the server instance.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Incomplete data in stream")]
    IncompleteData,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Frame of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(usize),

    #[error("No heartbeat received for {0} ms")]
    HeartbeatTimeout(u128),

    #[error("Session is closed")]
    SessionClosed,

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(String),
}

// `std::io::Error` is not cloneable, so it is shared behind an `Arc`.
impl Clone for GnssShareError {
    fn clone(&self) -> Self {
        match self {
            GnssShareError::Io(e) => GnssShareError::Io(Arc::clone(e)),
            GnssShareError::Bind { addr, source } => GnssShareError::Bind {
                addr: addr.clone(),
                source: Arc::clone(source),
            },
            GnssShareError::IncompleteData => GnssShareError::IncompleteData,
            GnssShareError::Protocol(s) => GnssShareError::Protocol(s.clone()),
            GnssShareError::FrameTooLarge(n) => GnssShareError::FrameTooLarge(*n),
            GnssShareError::HeartbeatTimeout(ms) => GnssShareError::HeartbeatTimeout(*ms),
            GnssShareError::SessionClosed => GnssShareError::SessionClosed,
            GnssShareError::Provider(e) => GnssShareError::Provider(e.clone()),
            GnssShareError::Config(s) => GnssShareError::Config(s.clone()),
        }
    }
}

impl PartialEq for GnssShareError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (GnssShareError::Io(e1), GnssShareError::Io(e2)) => e1.kind() == e2.kind(),
            (GnssShareError::Bind { addr: a1, .. }, GnssShareError::Bind { addr: a2, .. }) => {
                a1 == a2
            }
            (GnssShareError::Protocol(s1), GnssShareError::Protocol(s2)) => s1 == s2,
            (GnssShareError::FrameTooLarge(n1), GnssShareError::FrameTooLarge(n2)) => n1 == n2,
            (GnssShareError::HeartbeatTimeout(m1), GnssShareError::HeartbeatTimeout(m2)) => {
                m1 == m2
            }
            (GnssShareError::Provider(e1), GnssShareError::Provider(e2)) => e1 == e2,
            (GnssShareError::Config(s1), GnssShareError::Config(s2)) => s1 == s2,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl GnssShareError {
    /// Returns true for errors that simply mean the peer went away.
    pub fn is_normal_disconnect(&self) -> bool {
        matches!(self, GnssShareError::Io(e) if matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof
                | std::io::ErrorKind::ConnectionAborted
        ))
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for GnssShareError {
    fn from(e: std::io::Error) -> Self {
        GnssShareError::Io(Arc::new(e))
    }
}

impl From<FromUtf8Error> for GnssShareError {
    fn from(e: FromUtf8Error) -> Self {
        GnssShareError::Protocol(format!("invalid UTF-8 string field: {e}"))
    }
}
