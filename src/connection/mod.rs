// src/connection/mod.rs

//! Manages the lifecycle of a single client TCP connection: the initial
//! snapshot, the heartbeat read loop, the outbound writer and teardown.

mod guard;
mod handler;
mod session;

pub use guard::SessionGuard;
pub use handler::ConnectionHandler;
pub use session::ClientSession;
