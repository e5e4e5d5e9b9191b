// src/connection/handler.rs

//! Defines the `ConnectionHandler` which manages the full lifecycle of a client connection.

use super::guard::SessionGuard;
use super::session::ClientSession;
use crate::config::HeartbeatConfig;
use crate::core::GnssShareError;
use crate::core::hub::BroadcastHub;
use crate::core::protocol::ControlSymbol;
use bytes::Bytes;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::watch;
use tokio::time::{Instant, timeout};
use tracing::{debug, info, warn};

/// Drives one client: sends the initial snapshot, answers heartbeats,
/// enforces the heartbeat timeout and writes whatever the hub pushes.
pub struct ConnectionHandler<R = OwnedReadHalf, W = OwnedWriteHalf> {
    reader: R,
    writer: W,
    outbox: watch::Receiver<Option<Bytes>>,
    session: Arc<ClientSession>,
    hub: Arc<BroadcastHub>,
    heartbeat: HeartbeatConfig,
    _guard: SessionGuard,
}

impl ConnectionHandler {
    /// Creates a handler for an accepted TCP connection.
    pub fn from_tcp(
        socket: TcpStream,
        session: Arc<ClientSession>,
        outbox: watch::Receiver<Option<Bytes>>,
        hub: Arc<BroadcastHub>,
        heartbeat: HeartbeatConfig,
    ) -> Self {
        if let Err(e) = socket.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY for {}: {}", session.addr(), e);
        }
        let (reader, writer) = socket.into_split();
        Self::new(reader, writer, session, outbox, hub, heartbeat)
    }
}

impl<R, W> ConnectionHandler<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a handler over an arbitrary stream pair.
    ///
    /// The session's teardown guard is armed here, so the session is
    /// deregistered even if `run` is never polled.
    pub fn new(
        reader: R,
        writer: W,
        session: Arc<ClientSession>,
        outbox: watch::Receiver<Option<Bytes>>,
        hub: Arc<BroadcastHub>,
        heartbeat: HeartbeatConfig,
    ) -> Self {
        let guard = SessionGuard::new(hub.clone(), session.clone());
        Self {
            reader,
            writer,
            outbox,
            session,
            hub,
            heartbeat,
            _guard: guard,
        }
    }

    /// Runs the session until the client leaves, times out, fails a write or
    /// is disconnected by the hub.
    pub async fn run(self) -> Result<(), GnssShareError> {
        let Self {
            reader,
            writer,
            outbox,
            session,
            hub,
            heartbeat,
            _guard,
        } = self;

        info!("Client connected: {}", session.addr());
        push_snapshot(&hub, &session);

        let (read_result, write_result) = tokio::join!(
            read_loop(reader, &session, &hub, &heartbeat),
            write_loop(writer, outbox, &session),
        );

        info!("Client disconnected: {}", session.addr());
        read_result.and(write_result)
    }
}

/// Queues the current snapshot for this session.
fn push_snapshot(hub: &BroadcastHub, session: &ClientSession) {
    match hub.send_snapshot(session) {
        Ok(()) => {}
        Err(GnssShareError::SessionClosed) => {
            debug!("Not sending snapshot to {}: session closed.", session.addr())
        }
        Err(e) => warn!("Failed to encode snapshot for {}: {}", session.addr(), e),
    }
}

/// Reads control bytes until EOF, an I/O error, a heartbeat timeout or cancellation.
async fn read_loop<R>(
    mut reader: R,
    session: &ClientSession,
    hub: &BroadcastHub,
    heartbeat: &HeartbeatConfig,
) -> Result<(), GnssShareError>
where
    R: AsyncRead + Unpin,
{
    let mut last_heartbeat = Instant::now();

    let result = loop {
        let read = tokio::select! {
            biased;
            _ = session.cancelled() => break Ok(()),
            read = timeout(heartbeat.read_timeout, reader.read_u8()) => read,
        };

        let accepted = match read {
            Ok(Ok(byte)) => match ControlSymbol::from(byte) {
                ControlSymbol::Heartbeat => {
                    debug!("Heartbeat received from {}", session.addr());
                    last_heartbeat = Instant::now();
                    answer_heartbeat(hub, session, heartbeat);
                    true
                }
                ControlSymbol::Unknown(byte) => {
                    warn!(
                        "Unknown control symbol 0x{:02x} from {}",
                        byte,
                        session.addr()
                    );
                    false
                }
            },
            Ok(Err(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!("Client {} closed the connection.", session.addr());
                break Ok(());
            }
            Ok(Err(e)) => break Err(GnssShareError::from(e)),
            Err(_) => false,
        };

        if !accepted {
            let silent_for = last_heartbeat.elapsed();
            if silent_for > heartbeat.timeout {
                warn!(
                    "Heartbeat timeout for {} ({} ms without heartbeat)",
                    session.addr(),
                    silent_for.as_millis()
                );
                break Err(GnssShareError::HeartbeatTimeout(silent_for.as_millis()));
            }
        }
    };

    session.disconnect();
    result
}

/// Resends the snapshot if no fix is known yet or this client has not been
/// sent anything for longer than the response interval.
fn answer_heartbeat(hub: &BroadcastHub, session: &ClientSession, heartbeat: &HeartbeatConfig) {
    let has_fix = hub.snapshot().has_location();
    let stale = session
        .last_response()
        .is_none_or(|sent| sent.elapsed() > heartbeat.response_interval);
    if !has_fix || stale {
        debug!("Sending heartbeat response to {}", session.addr());
        push_snapshot(hub, session);
    }
}

/// Writes pushed frames in order until the session closes or a write fails.
async fn write_loop<W>(
    mut writer: W,
    mut outbox: watch::Receiver<Option<Bytes>>,
    session: &ClientSession,
) -> Result<(), GnssShareError>
where
    W: AsyncWrite + Unpin,
{
    let result = loop {
        tokio::select! {
            biased;
            _ = session.cancelled() => break Ok(()),
            changed = outbox.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
            }
        }

        let Some(frame) = outbox.borrow_and_update().clone() else {
            continue;
        };

        let written = tokio::select! {
            biased;
            _ = session.cancelled() => break Ok(()),
            written = write_frame(&mut writer, &frame) => written,
        };
        if let Err(e) = written {
            warn!("Failed to send frame to {}: {}", session.addr(), e);
            break Err(GnssShareError::from(e));
        }
        session.mark_sent();
    };

    session.disconnect();
    if let Err(e) = writer.shutdown().await {
        debug!("Error closing connection to {}: {}", session.addr(), e);
    }
    result
}

async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await
}
