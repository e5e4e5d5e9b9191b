// src/core/protocol/message.rs

//! The `ServerResponse` message pushed to clients, encoded in Protocol Buffers
//! wire format so that existing protobuf-generated clients can decode it.
//!
//! ```text
//! message LocationUpdate {
//!   int64  timestamp    = 1;
//!   double latitude     = 2;
//!   double longitude    = 3;
//!   string provider     = 4;
//!   float  location_age = 5;
//!   optional double altitude = 6;
//!   optional float  accuracy = 7;
//!   optional float  bearing  = 8;
//!   optional float  speed    = 9;
//! }
//!
//! message ServerResponse {
//!   string         status          = 1;
//!   LocationUpdate location_update = 2;
//!   int32          satellites      = 3;
//! }
//! ```
//!
//! Encoding is canonical: fields are written in tag order, implicit-presence
//! fields are omitted when they hold their default value, and `optional`
//! fields are written exactly when present.

use super::wire::{
    WIRE_FIXED32, WIRE_FIXED64, WIRE_LEN, WIRE_VARINT, expect_wire_type, get_double, get_float,
    get_key, get_len_delimited, get_varint, put_double, put_float, put_key, put_len_delimited,
    put_varint, skip_field,
};
use crate::core::GnssShareError;
use crate::core::state::{LocationFix, ServerState, ServerStatus};
use bytes::{Bytes, BytesMut};
use std::str::FromStr;

/// The wire form of a location fix, including its age at encode time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocationUpdate {
    pub timestamp: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub provider: String,
    /// Seconds between the fix timestamp and the moment the message was built.
    pub location_age: f32,
    pub altitude: Option<f64>,
    pub accuracy: Option<f32>,
    pub bearing: Option<f32>,
    pub speed: Option<f32>,
}

/// The only message the server sends.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerResponse {
    pub status: String,
    pub location_update: Option<LocationUpdate>,
    pub satellites: u32,
}

impl LocationUpdate {
    /// Builds the wire form of `fix`, computing its age relative to `now_millis`.
    pub fn from_fix(fix: &LocationFix, now_millis: i64) -> Self {
        Self {
            timestamp: fix.timestamp,
            latitude: fix.latitude,
            longitude: fix.longitude,
            provider: fix.provider.clone(),
            location_age: fix.age_secs(now_millis),
            altitude: fix.altitude,
            accuracy: fix.accuracy,
            bearing: fix.bearing,
            speed: fix.speed,
        }
    }

    /// Converts back into a domain fix. The age is dropped since it is derived.
    pub fn to_fix(&self) -> LocationFix {
        LocationFix {
            timestamp: self.timestamp,
            latitude: self.latitude,
            longitude: self.longitude,
            provider: self.provider.clone(),
            altitude: self.altitude,
            accuracy: self.accuracy,
            bearing: self.bearing,
            speed: self.speed,
        }
    }

    fn encode_to(&self, dst: &mut BytesMut) {
        if self.timestamp != 0 {
            put_key(dst, 1, WIRE_VARINT);
            put_varint(dst, self.timestamp as u64);
        }
        if self.latitude != 0.0 {
            put_double(dst, 2, self.latitude);
        }
        if self.longitude != 0.0 {
            put_double(dst, 3, self.longitude);
        }
        if !self.provider.is_empty() {
            put_len_delimited(dst, 4, self.provider.as_bytes());
        }
        if self.location_age != 0.0 {
            put_float(dst, 5, self.location_age);
        }
        if let Some(altitude) = self.altitude {
            put_double(dst, 6, altitude);
        }
        if let Some(accuracy) = self.accuracy {
            put_float(dst, 7, accuracy);
        }
        if let Some(bearing) = self.bearing {
            put_float(dst, 8, bearing);
        }
        if let Some(speed) = self.speed {
            put_float(dst, 9, speed);
        }
    }

    fn decode(mut src: &[u8]) -> Result<Self, GnssShareError> {
        let mut update = LocationUpdate::default();
        while !src.is_empty() {
            let (field, wire_type) = get_key(&mut src)?;
            match field {
                1 => {
                    expect_wire_type(field, wire_type, WIRE_VARINT)?;
                    update.timestamp = get_varint(&mut src)? as i64;
                }
                2 => {
                    expect_wire_type(field, wire_type, WIRE_FIXED64)?;
                    update.latitude = get_double(&mut src)?;
                }
                3 => {
                    expect_wire_type(field, wire_type, WIRE_FIXED64)?;
                    update.longitude = get_double(&mut src)?;
                }
                4 => {
                    expect_wire_type(field, wire_type, WIRE_LEN)?;
                    update.provider = String::from_utf8(get_len_delimited(&mut src)?.to_vec())?;
                }
                5 => {
                    expect_wire_type(field, wire_type, WIRE_FIXED32)?;
                    update.location_age = get_float(&mut src)?;
                }
                6 => {
                    expect_wire_type(field, wire_type, WIRE_FIXED64)?;
                    update.altitude = Some(get_double(&mut src)?);
                }
                7 => {
                    expect_wire_type(field, wire_type, WIRE_FIXED32)?;
                    update.accuracy = Some(get_float(&mut src)?);
                }
                8 => {
                    expect_wire_type(field, wire_type, WIRE_FIXED32)?;
                    update.bearing = Some(get_float(&mut src)?);
                }
                9 => {
                    expect_wire_type(field, wire_type, WIRE_FIXED32)?;
                    update.speed = Some(get_float(&mut src)?);
                }
                _ => skip_field(&mut src, wire_type)?,
            }
        }
        Ok(update)
    }
}

impl ServerResponse {
    /// Builds the message for `state` as seen at `now_millis`.
    pub fn from_state(state: &ServerState, now_millis: i64) -> Self {
        Self {
            status: state.status.to_string(),
            location_update: state
                .location
                .as_ref()
                .map(|fix| LocationUpdate::from_fix(fix, now_millis)),
            satellites: state.satellites,
        }
    }

    /// Parses the status string. Returns `None` for a status this build does not know.
    pub fn server_status(&self) -> Option<ServerStatus> {
        ServerStatus::from_str(&self.status).ok()
    }

    /// Appends the encoded payload (without length prefix) to `dst`.
    pub fn encode_to(&self, dst: &mut BytesMut) {
        if !self.status.is_empty() {
            put_len_delimited(dst, 1, self.status.as_bytes());
        }
        if let Some(update) = &self.location_update {
            let mut nested = BytesMut::new();
            update.encode_to(&mut nested);
            put_len_delimited(dst, 2, &nested);
        }
        if self.satellites != 0 {
            put_key(dst, 3, WIRE_VARINT);
            put_varint(dst, self.satellites as u64);
        }
    }

    /// Encodes the payload into a fresh buffer.
    pub fn encode_to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode_to(&mut buf);
        buf.freeze()
    }

    /// Decodes a complete payload (without length prefix).
    pub fn decode(mut src: &[u8]) -> Result<Self, GnssShareError> {
        let mut response = ServerResponse::default();
        while !src.is_empty() {
            let (field, wire_type) = get_key(&mut src)?;
            match field {
                1 => {
                    expect_wire_type(field, wire_type, WIRE_LEN)?;
                    response.status = String::from_utf8(get_len_delimited(&mut src)?.to_vec())?;
                }
                2 => {
                    expect_wire_type(field, wire_type, WIRE_LEN)?;
                    response.location_update =
                        Some(LocationUpdate::decode(get_len_delimited(&mut src)?)?);
                }
                3 => {
                    expect_wire_type(field, wire_type, WIRE_VARINT)?;
                    let raw = get_varint(&mut src)?;
                    response.satellites = u32::try_from(raw).map_err(|_| {
                        GnssShareError::Protocol(format!("satellite count out of range: {raw}"))
                    })?;
                }
                _ => skip_field(&mut src, wire_type)?,
            }
        }
        Ok(response)
    }
}
