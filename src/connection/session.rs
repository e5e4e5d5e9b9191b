// src/connection/session.rs

//! Defines the shared handle for a single client session.

use bytes::Bytes;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// The part of a client connection that the hub can see.
///
/// The hub only ever pushes frames into the outbox and requests a disconnect;
/// the socket itself is owned by the connection's worker.
#[derive(Debug)]
pub struct ClientSession {
    id: u64,
    addr: SocketAddr,
    /// Single-slot outbox. A frame pushed before the writer drained the
    /// previous one replaces it.
    outbox: watch::Sender<Option<Bytes>>,
    /// When a frame was last fully written to this client.
    last_response: Mutex<Option<Instant>>,
    cancel: CancellationToken,
}

impl ClientSession {
    /// Creates a session and the outbox receiver its writer drains.
    pub fn new(id: u64, addr: SocketAddr) -> (Arc<Self>, watch::Receiver<Option<Bytes>>) {
        let (outbox, rx) = watch::channel(None);
        let session = Arc::new(Self {
            id,
            addr,
            outbox,
            last_response: Mutex::new(None),
            cancel: CancellationToken::new(),
        });
        (session, rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Queues `frame` for sending. Returns `false` if the session is closed.
    pub fn push(&self, frame: Bytes) -> bool {
        if self.is_closed() {
            return false;
        }
        self.outbox.send_replace(Some(frame));
        true
    }

    /// Asks the worker to close the connection. Idempotent.
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the session has been asked to close.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Records that a frame was just written to the client.
    pub fn mark_sent(&self) {
        *self.last_response.lock() = Some(Instant::now());
    }

    pub fn last_response(&self) -> Option<Instant> {
        *self.last_response.lock()
    }
}
