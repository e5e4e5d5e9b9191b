// src/core/protocol/frame.rs

//! Length-prefixed framing for server messages and decoding of the
//! single-byte control symbols sent by clients.
//!
//! ```text
//! Server -> client: [4 bytes BE: payload length][payload: ServerResponse]
//! Client -> server: [1 byte: 0x01 = heartbeat, anything else is ignored]
//! ```

use super::message::ServerResponse;
use crate::core::GnssShareError;
use crate::core::state::ServerState;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Size of the big-endian length prefix in front of every payload.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Upper bound on a single payload. Real payloads are well under 200 bytes.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// The control byte a client sends to signal it is still alive.
pub const HEARTBEAT_BYTE: u8 = 0x01;

/// A single control byte received from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSymbol {
    Heartbeat,
    /// Any other byte. Must be logged and must not count towards liveness.
    Unknown(u8),
}

impl From<u8> for ControlSymbol {
    fn from(byte: u8) -> Self {
        match byte {
            HEARTBEAT_BYTE => ControlSymbol::Heartbeat,
            other => ControlSymbol::Unknown(other),
        }
    }
}

/// Encodes `state` into a payload, deriving the fix age from the current wall clock.
pub fn encode(state: &ServerState) -> Bytes {
    encode_at(state, chrono::Utc::now().timestamp_millis())
}

/// Encodes `state` into a payload as seen at `now_millis`.
pub fn encode_at(state: &ServerState, now_millis: i64) -> Bytes {
    ServerResponse::from_state(state, now_millis).encode_to_bytes()
}

/// Prepends the 4-byte big-endian length to `payload`.
pub fn frame(payload: &[u8]) -> Result<Bytes, GnssShareError> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(GnssShareError::FrameTooLarge(payload.len()));
    }
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// A `tokio_util::codec` implementation for whole `ServerResponse` frames.
///
/// The server only needs the encoder; the decoder is what clients use.
#[derive(Debug, Clone)]
pub struct ServerResponseCodec {
    max_frame_size: usize,
}

impl ServerResponseCodec {
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for ServerResponseCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder<ServerResponse> for ServerResponseCodec {
    type Error = GnssShareError;

    fn encode(&mut self, item: ServerResponse, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = item.encode_to_bytes();
        if payload.len() > self.max_frame_size {
            return Err(GnssShareError::FrameTooLarge(payload.len()));
        }
        dst.reserve(LENGTH_PREFIX_LEN + payload.len());
        dst.put_u32(payload.len() as u32);
        dst.put_slice(&payload);
        Ok(())
    }
}

impl Decoder for ServerResponseCodec {
    type Item = ServerResponse;
    type Error = GnssShareError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_PREFIX_LEN {
            return Ok(None);
        }

        let mut prefix = [0u8; LENGTH_PREFIX_LEN];
        prefix.copy_from_slice(&src[..LENGTH_PREFIX_LEN]);
        let len = u32::from_be_bytes(prefix) as usize;
        if len > self.max_frame_size {
            return Err(GnssShareError::FrameTooLarge(len));
        }

        if src.len() < LENGTH_PREFIX_LEN + len {
            src.reserve(LENGTH_PREFIX_LEN + len - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_LEN);
        let payload = src.split_to(len);
        ServerResponse::decode(&payload).map(Some)
    }
}
