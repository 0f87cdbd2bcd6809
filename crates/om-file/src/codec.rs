//! Chunk codec: int16 quantization, 2-D delta coding, zig-zag varints.
//!
//! A chunk is a `[location, time]` tile with time as the inner axis. Encoding
//! runs three stages:
//!
//! 1. Quantize: `round(value * scalefactor)` into int16, `i16::MIN` for
//!    missing values.
//! 2. Delta: one pass along the time axis, then one along the location axis.
//!    The first time column and first location row come out of the passes as
//!    the stored references. Wrapping arithmetic keeps every delta inside
//!    int16 and the transform exactly invertible.
//! 3. Zig-zag + variable-byte: `(d << 1) ^ (d >> 15)`, then continuation-bit
//!    bytes, 7 data bits each.
//!
//! A chunk of nothing but missing values encodes to zero bytes.

use crate::error::{ColumnFileError, Result};
use bytes::{Buf, BufMut};
use std::path::Path;

/// Quantized sentinel for a missing cell.
pub const MISSING: i16 = i16::MIN;

/// Quantize one value. Non-finite values map to the missing sentinel; finite
/// values are clamped so they can never collide with it.
#[inline]
pub fn quantize(value: f32, scalefactor: f32) -> i16 {
    if !value.is_finite() {
        return MISSING;
    }
    (value * scalefactor).round().clamp((MISSING + 1) as f32, i16::MAX as f32) as i16
}

/// Invert [`quantize`]. The missing sentinel decodes to NaN.
#[inline]
pub fn dequantize(q: i16, scalefactor: f32) -> f32 {
    if q == MISSING {
        f32::NAN
    } else {
        q as f32 / scalefactor
    }
}

/// Zig-zag an int16 so small magnitudes of either sign become small unsigned
/// values.
#[inline]
fn zigzag(d: i16) -> u16 {
    ((d << 1) ^ (d >> 15)) as u16
}

#[inline]
fn unzigzag(z: u16) -> i16 {
    ((z >> 1) as i16) ^ -((z & 1) as i16)
}

/// Continuation-bit encode, 1-3 bytes for a u16.
fn put_varint(buf: &mut impl BufMut, mut value: u16) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if value == 0 {
            break;
        }
    }
}

fn get_varint(buf: &mut impl Buf) -> Option<u16> {
    let mut value: u32 = 0;
    let mut shift = 0;
    loop {
        if !buf.has_remaining() || shift > 14 {
            return None;
        }
        let byte = buf.get_u8();
        value |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    u16::try_from(value).ok()
}

/// In-place forward delta: time axis first, then location axis.
fn delta_forward(cells: &mut [i16], n_loc: usize, n_time: usize) {
    for l in 0..n_loc {
        let row = l * n_time;
        for t in (1..n_time).rev() {
            cells[row + t] = cells[row + t].wrapping_sub(cells[row + t - 1]);
        }
    }
    for l in (1..n_loc).rev() {
        for t in 0..n_time {
            cells[l * n_time + t] = cells[l * n_time + t].wrapping_sub(cells[(l - 1) * n_time + t]);
        }
    }
}

/// Invert [`delta_forward`]: location axis first, then time axis.
fn delta_inverse(cells: &mut [i16], n_loc: usize, n_time: usize) {
    for l in 1..n_loc {
        for t in 0..n_time {
            cells[l * n_time + t] = cells[l * n_time + t].wrapping_add(cells[(l - 1) * n_time + t]);
        }
    }
    for l in 0..n_loc {
        let row = l * n_time;
        for t in 1..n_time {
            cells[row + t] = cells[row + t].wrapping_add(cells[row + t - 1]);
        }
    }
}

/// Compress one chunk of `n_loc * n_time` values.
///
/// Returns an empty vector when every cell is missing; the writer records that
/// as a zero-length index entry with no payload.
pub fn encode_chunk(values: &[f32], n_loc: usize, n_time: usize, scalefactor: f32) -> Vec<u8> {
    debug_assert_eq!(values.len(), n_loc * n_time);

    let mut cells: Vec<i16> = values.iter().map(|&v| quantize(v, scalefactor)).collect();
    if cells.iter().all(|&q| q == MISSING) {
        return Vec::new();
    }

    delta_forward(&mut cells, n_loc, n_time);

    let mut out = Vec::with_capacity(cells.len());
    for &d in &cells {
        put_varint(&mut out, zigzag(d));
    }
    out
}

/// Decompress one chunk back to `n_loc * n_time` values.
///
/// An empty payload is the all-missing chunk. A payload that decodes to the
/// wrong cell count is a format error.
pub fn decode_chunk(
    path: &Path,
    payload: &[u8],
    n_loc: usize,
    n_time: usize,
    scalefactor: f32,
) -> Result<Vec<f32>> {
    let n_cells = n_loc * n_time;
    if payload.is_empty() {
        return Ok(vec![f32::NAN; n_cells]);
    }

    let mut cells = Vec::with_capacity(n_cells);
    let mut buf = payload;
    for _ in 0..n_cells {
        let z = get_varint(&mut buf).ok_or_else(|| {
            ColumnFileError::format_invalid(path, "truncated chunk payload")
        })?;
        cells.push(unzigzag(z));
    }
    if buf.has_remaining() {
        return Err(ColumnFileError::format_invalid(
            path,
            "trailing bytes after chunk payload",
        ));
    }

    delta_inverse(&mut cells, n_loc, n_time);
    Ok(cells.iter().map(|&q| dequantize(q, scalefactor)).collect())
}
