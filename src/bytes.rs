//! Big-endian primitive pack/unpack helpers over byte slices.
//!
//! DNS is big-endian throughout; every multi-byte integer on the wire goes
//! through one of these.

use byteorder::{BigEndian, ByteOrder};

#[inline]
pub fn read_u16(buf: &[u8]) -> u16 {
    BigEndian::read_u16(buf)
}

#[inline]
pub fn read_u32(buf: &[u8]) -> u32 {
    BigEndian::read_u32(buf)
}

#[inline]
pub fn read_u64(buf: &[u8]) -> u64 {
    BigEndian::read_u64(buf)
}

#[inline]
pub fn write_u16(buf: &mut [u8], v: u16) {
    BigEndian::write_u16(buf, v)
}

#[inline]
pub fn write_u32(buf: &mut [u8], v: u32) {
    BigEndian::write_u32(buf, v)
}

#[inline]
pub fn write_u64(buf: &mut [u8], v: u64) {
    BigEndian::write_u64(buf, v)
}

/// Appends a big-endian `u16` to a growing buffer.
#[inline]
pub fn push_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// Appends a big-endian `u32` to a growing buffer.
#[inline]
pub fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// Appends a big-endian `u64` to a growing buffer.
#[inline]
pub fn push_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}
