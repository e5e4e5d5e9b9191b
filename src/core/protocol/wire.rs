// src/core/protocol/wire.rs

//! Low-level Protocol Buffers wire primitives used by `message`.
//!
//! Only the subset needed by the schema is implemented: varints, 64-bit and
//! 32-bit fixed values, and length-delimited fields. Group wire types are
//! rejected.

use crate::core::GnssShareError;
use bytes::{Buf, BufMut, BytesMut};

pub(crate) const WIRE_VARINT: u8 = 0;
pub(crate) const WIRE_FIXED64: u8 = 1;
pub(crate) const WIRE_LEN: u8 = 2;
pub(crate) const WIRE_FIXED32: u8 = 5;

/// A varint never needs more than ten bytes for a `u64`.
const MAX_VARINT_LEN: usize = 10;

pub(crate) fn put_varint(dst: &mut BytesMut, mut value: u64) {
    while value >= 0x80 {
        dst.put_u8((value as u8) | 0x80);
        value >>= 7;
    }
    dst.put_u8(value as u8);
}

pub(crate) fn put_key(dst: &mut BytesMut, field: u32, wire_type: u8) {
    put_varint(dst, ((field as u64) << 3) | wire_type as u64);
}

pub(crate) fn put_len_delimited(dst: &mut BytesMut, field: u32, payload: &[u8]) {
    put_key(dst, field, WIRE_LEN);
    put_varint(dst, payload.len() as u64);
    dst.put_slice(payload);
}

pub(crate) fn put_double(dst: &mut BytesMut, field: u32, value: f64) {
    put_key(dst, field, WIRE_FIXED64);
    dst.put_f64_le(value);
}

pub(crate) fn put_float(dst: &mut BytesMut, field: u32, value: f32) {
    put_key(dst, field, WIRE_FIXED32);
    dst.put_f32_le(value);
}

pub(crate) fn get_varint(src: &mut &[u8]) -> Result<u64, GnssShareError> {
    let mut value: u64 = 0;
    for i in 0..MAX_VARINT_LEN {
        if !src.has_remaining() {
            return Err(GnssShareError::IncompleteData);
        }
        let byte = src.get_u8();
        value |= ((byte & 0x7f) as u64) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(GnssShareError::Protocol("varint is too long".into()))
}

/// Reads a field key and splits it into `(field number, wire type)`.
pub(crate) fn get_key(src: &mut &[u8]) -> Result<(u32, u8), GnssShareError> {
    let key = get_varint(src)?;
    let field = u32::try_from(key >> 3)
        .map_err(|_| GnssShareError::Protocol(format!("field number out of range: {key}")))?;
    if field == 0 {
        return Err(GnssShareError::Protocol("field number 0 is reserved".into()));
    }
    Ok((field, (key & 0x07) as u8))
}

pub(crate) fn get_len_delimited<'a>(src: &mut &'a [u8]) -> Result<&'a [u8], GnssShareError> {
    let len = get_varint(src)? as usize;
    if src.len() < len {
        return Err(GnssShareError::IncompleteData);
    }
    let (payload, rest) = src.split_at(len);
    *src = rest;
    Ok(payload)
}

pub(crate) fn get_double(src: &mut &[u8]) -> Result<f64, GnssShareError> {
    if src.remaining() < 8 {
        return Err(GnssShareError::IncompleteData);
    }
    Ok(src.get_f64_le())
}

pub(crate) fn get_float(src: &mut &[u8]) -> Result<f32, GnssShareError> {
    if src.remaining() < 4 {
        return Err(GnssShareError::IncompleteData);
    }
    Ok(src.get_f32_le())
}

/// Skips over the value of a field the schema does not know about.
pub(crate) fn skip_field(src: &mut &[u8], wire_type: u8) -> Result<(), GnssShareError> {
    match wire_type {
        WIRE_VARINT => {
            get_varint(src)?;
        }
        WIRE_FIXED64 => {
            get_double(src)?;
        }
        WIRE_LEN => {
            get_len_delimited(src)?;
        }
        WIRE_FIXED32 => {
            get_float(src)?;
        }
        other => {
            return Err(GnssShareError::Protocol(format!(
                "unsupported wire type {other}"
            )));
        }
    }
    Ok(())
}

/// Checks that a known field arrived with the wire type the schema expects.
pub(crate) fn expect_wire_type(field: u32, actual: u8, expected: u8) -> Result<(), GnssShareError> {
    if actual != expected {
        return Err(GnssShareError::Protocol(format!(
            "field {field} has wire type {actual}, expected {expected}"
        )));
    }
    Ok(())
}
