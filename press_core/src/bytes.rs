//! Fixed-width little-endian integer helpers shared by every binary field.
//!
//! Decoders take a slice and an offset and return [`Error::Corrupt`] when the
//! slice is too short, so parsers can use `?` instead of indexing blindly.

use crate::error::{Error, Result};

#[inline]
pub fn put_u16_le(out: &mut Vec<u8>, n: u16) {
    out.extend_from_slice(&n.to_le_bytes());
}

#[inline]
pub fn put_u32_le(out: &mut Vec<u8>, n: u32) {
    out.extend_from_slice(&n.to_le_bytes());
}

#[inline]
pub fn put_u64_le(out: &mut Vec<u8>, n: u64) {
    out.extend_from_slice(&n.to_le_bytes());
}

fn field<const N: usize>(buf: &[u8], at: usize) -> Result<[u8; N]> {
    at.checked_add(N)
        .and_then(|end| buf.get(at..end))
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            Error::corrupt(format!(
                "truncated field: need {} bytes at offset {}, have {}",
                N,
                at,
                buf.len()
            ))
        })
}

pub fn get_u16_le(buf: &[u8], at: usize) -> Result<u16> {
    Ok(u16::from_le_bytes(field(buf, at)?))
}

pub fn get_u32_le(buf: &[u8], at: usize) -> Result<u32> {
    Ok(u32::from_le_bytes(field(buf, at)?))
}

pub fn get_u64_le(buf: &[u8], at: usize) -> Result<u64> {
    Ok(u64::from_le_bytes(field(buf, at)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_layout() {
        let mut buf = Vec::new();
        put_u16_le(&mut buf, 0x0102);
        put_u32_le(&mut buf, 0xA0B0_C0D0);
        assert_eq!(buf, [0x02, 0x01, 0xD0, 0xC0, 0xB0, 0xA0]);
        assert_eq!(get_u16_le(&buf, 0).unwrap(), 0x0102);
        assert_eq!(get_u32_le(&buf, 2).unwrap(), 0xA0B0_C0D0);
    }

    #[test]
    fn short_slice_is_corrupt() {
        let err = get_u32_le(&[1, 2, 3], 0).unwrap_err();
        assert!(err.is_corrupt());
        assert!(get_u16_le(&[1, 2], usize::MAX).unwrap_err().is_corrupt());
    }
}
