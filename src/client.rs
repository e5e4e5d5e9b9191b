// src/client.rs

//! A minimal client for the location broadcast protocol, used by the
//! integration tests and handy for poking at a running server.

use crate::core::GnssShareError;
use crate::core::protocol::{HEARTBEAT_BYTE, ServerResponse, ServerResponseCodec};
use futures::StreamExt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::FramedRead;

/// A connected client. Reads whole `ServerResponse` frames and writes raw
/// control bytes.
pub struct LocationClient {
    frames: FramedRead<OwnedReadHalf, ServerResponseCodec>,
    writer: OwnedWriteHalf,
}

impl LocationClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self, GnssShareError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            frames: FramedRead::new(reader, ServerResponseCodec::new()),
            writer,
        })
    }

    pub async fn send_heartbeat(&mut self) -> Result<(), GnssShareError> {
        self.send_byte(HEARTBEAT_BYTE).await
    }

    /// Sends a single control byte.
    pub async fn send_byte(&mut self, byte: u8) -> Result<(), GnssShareError> {
        self.writer.write_u8(byte).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Waits for the next frame. `Ok(None)` means the server closed the connection.
    pub async fn next_response(&mut self) -> Result<Option<ServerResponse>, GnssShareError> {
        self.frames.next().await.transpose()
    }

    /// Like `next_response`, but gives up after `wait`.
    pub async fn next_response_within(
        &mut self,
        wait: Duration,
    ) -> Result<Option<ServerResponse>, GnssShareError> {
        match tokio::time::timeout(wait, self.next_response()).await {
            Ok(result) => result,
            Err(_) => Err(GnssShareError::Io(std::sync::Arc::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "no frame received in time",
            )))),
        }
    }

    /// Closes the write side, which the server sees as end of stream.
    pub async fn close(mut self) -> Result<(), GnssShareError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
