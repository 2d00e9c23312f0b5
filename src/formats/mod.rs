//! Binary container formats.
//!
//! Two little-endian, byte-exact codecs:
//! - [`gmt`] - the animation container (curves, graphs, name tables)
//! - [`cmt`] - the camera-track container
//!
//! Both use explicit byte serialization; no struct is memory-mapped.

pub mod cmt;
pub mod gmt;

use crate::error::ConvertError;

#[inline]
pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> Result<u16, ConvertError> {
    let s = bytes
        .get(offset..offset + 2)
        .ok_or_else(|| truncated(offset))?;
    Ok(u16::from_le_bytes([s[0], s[1]]))
}

#[inline]
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, ConvertError> {
    let s = bytes
        .get(offset..offset + 4)
        .ok_or_else(|| truncated(offset))?;
    Ok(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
}

#[inline]
pub(crate) fn read_f32(bytes: &[u8], offset: usize) -> Result<f32, ConvertError> {
    Ok(f32::from_bits(read_u32(bytes, offset)?))
}

#[inline]
pub(crate) fn read_i16(bytes: &[u8], offset: usize) -> Result<i16, ConvertError> {
    Ok(read_u16(bytes, offset)? as i16)
}

fn truncated(offset: usize) -> ConvertError {
    ConvertError::malformed(format!("truncated at offset {offset:#x}"))
}

#[inline]
pub(crate) fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

#[inline]
pub(crate) fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

#[inline]
pub(crate) fn put_f32(buf: &mut Vec<u8>, v: f32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

#[inline]
pub(crate) fn put_i16(buf: &mut Vec<u8>, v: i16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Patch a previously written u32 field in place.
#[inline]
pub(crate) fn patch_u32(buf: &mut [u8], offset: usize, v: u32) {
    buf[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
}
