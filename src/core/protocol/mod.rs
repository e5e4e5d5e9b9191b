// src/core/protocol/mod.rs

//! The client wire protocol: the `ServerResponse` message schema, its
//! length-prefixed framing, and the single-byte control symbols clients send.

pub mod frame;
pub mod message;
mod wire;

pub use frame::{
    ControlSymbol, HEARTBEAT_BYTE, LENGTH_PREFIX_LEN, MAX_FRAME_SIZE, ServerResponseCodec,
    encode, encode_at, frame,
};
pub use message::{LocationUpdate, ServerResponse};
