//! LEB128 varint and zig-zag codecs.
//!
//! Decoding first attempts a single pass over a peeked window of up to
//! [`MAX_VARINT_LEN64`] bytes and only falls back to byte-by-byte reads
//! when the window is too short to hold the full encoding.

use bytes::BytesMut;

use super::bufio::ByteReader;
use crate::error::{Error, Result};

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT_LEN64: usize = 10;

/// Decodes a uvarint from the front of `buf`. Returns the value and the
/// number of bytes consumed, or `None` when `buf` ends before the varint
/// terminates.
///
/// # Errors
///
/// [`Error::VarintOverflow`] when the encoding runs past 10 bytes.
fn decode_uvarint(buf: &[u8]) -> Result<Option<(u64, usize)>> {
    let mut x = 0u64;
    let mut shift = 0u32;
    for (i, &b) in buf.iter().enumerate() {
        if i >= MAX_VARINT_LEN64 {
            return Err(Error::VarintOverflow);
        }
        if b < 0x80 {
            if i == MAX_VARINT_LEN64 - 1 && b > 1 {
                return Err(Error::VarintOverflow);
            }
            return Ok(Some((x | u64::from(b) << shift, i + 1)));
        }
        x |= u64::from(b & 0x7f) << shift;
        shift += 7;
    }
    if buf.len() >= MAX_VARINT_LEN64 {
        return Err(Error::VarintOverflow);
    }
    Ok(None)
}

/// Reads an unsigned LEB128 integer.
pub fn read_uvarint(b: &mut ByteReader) -> Result<u64> {
    if let Some((x, n)) = decode_uvarint(b.peek(MAX_VARINT_LEN64)?)? {
        b.discard(n)?;
        return Ok(x);
    }
    // The peeked window ended mid-varint; decode byte by byte.
    let mut x = 0u64;
    let mut shift = 0u32;
    for i in 0..MAX_VARINT_LEN64 {
        let byte = b.read_u8()?;
        if byte < 0x80 {
            if i == MAX_VARINT_LEN64 - 1 && byte > 1 {
                return Err(Error::VarintOverflow);
            }
            return Ok(x | u64::from(byte) << shift);
        }
        x |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }
    Err(Error::VarintOverflow)
}

/// Reads a zig-zag-encoded signed integer.
pub fn read_varint(b: &mut ByteReader) -> Result<i64> {
    let ux = read_uvarint(b)?;
    Ok(((ux >> 1) as i64) ^ -((ux & 1) as i64))
}

/// Appends `v` as an unsigned LEB128 integer.
pub fn put_uvarint(buf: &mut BytesMut, mut v: u64) {
    while v >= 0x80 {
        buf.extend_from_slice(&[v as u8 | 0x80]);
        v >>= 7;
    }
    buf.extend_from_slice(&[v as u8]);
}

/// Appends `v` zig-zag encoded.
pub fn put_varint(buf: &mut BytesMut, v: i64) {
    put_uvarint(buf, ((v << 1) ^ (v >> 63)) as u64);
}
