//! Gzip plumbing for the container trailer.
//!
//! The block index is gzipped, then carried in the FEXTRA field of a run of
//! otherwise empty gzip members. A generic gzip reader sees those members as
//! empty output with ignorable extra data; [`unwrap_index`] puts the payload
//! back together.
//!
//! ```text
//! [hdr|xlen|chunk 0|body+ftr] ... [hdr|xlen|chunk k|body+ftr]   ← wrapped index
//! [hdr|04 00|total_len:u32|body+ftr]                            ← trailer (26 bytes)
//! ```

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;

use crate::bytes::{get_u16_le, get_u32_le, put_u16_le, put_u32_le};
use crate::error::{Error, Result};
use crate::format::{
    GZIP_BODY_AND_FOOTER_SIZE, GZIP_EMPTY_BODY_AND_FOOTER, GZIP_HEADER, GZIP_HEADER_SIZE,
    LENGTH_OFFSET_FROM_END, MAX_EXTRA_PAYLOAD, TRAILER_SIZE, XLEN_SIZE,
};

/// Default deflate level used for the index itself.
pub const INDEX_GZIP_LEVEL: u32 = 6;

/// Compress `raw` into a single gzip member at `level` (0 = store, 9 = max).
pub fn gzip_compress(raw: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(raw.len() / 2 + 64), GzLevel::new(level));
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

/// Decode one gzip member. A malformed stream is reported as corruption.
pub fn gzip_decompress(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    GzDecoder::new(compressed)
        .read_to_end(&mut raw)
        .map_err(|e| Error::corrupt(format!("gzip stream: {}", e)))?;
    Ok(raw)
}

/// Split `blob` into empty gzip members carrying it in their extra fields and
/// close the run with the fixed-size trailer.
pub fn wrap_index(blob: &[u8]) -> Vec<u8> {
    let members = blob.len().div_ceil(MAX_EXTRA_PAYLOAD);
    let member_overhead = (GZIP_HEADER_SIZE + XLEN_SIZE + GZIP_BODY_AND_FOOTER_SIZE) as usize;
    let mut out = Vec::with_capacity(blob.len() + members * member_overhead + TRAILER_SIZE as usize);

    for chunk in blob.chunks(MAX_EXTRA_PAYLOAD) {
        out.extend_from_slice(&GZIP_HEADER);
        put_u16_le(&mut out, chunk.len() as u16);
        out.extend_from_slice(chunk);
        out.extend_from_slice(&GZIP_EMPTY_BODY_AND_FOOTER);
    }

    let wrapped_len = out.len() as u32;
    out.extend_from_slice(&GZIP_HEADER);
    put_u16_le(&mut out, 4);
    put_u32_le(&mut out, wrapped_len);
    out.extend_from_slice(&GZIP_EMPTY_BODY_AND_FOOTER);
    out
}

/// Parse the 26-byte trailer and return the length of the wrapped index that
/// precedes it. Every fixed byte is checked before the length is trusted.
pub fn parse_trailer(trailer: &[u8]) -> Result<u64> {
    if trailer.len() != TRAILER_SIZE as usize {
        return Err(Error::corrupt(format!(
            "trailer is {} bytes, expected {}",
            trailer.len(),
            TRAILER_SIZE
        )));
    }
    let hdr = GZIP_HEADER_SIZE as usize;
    if trailer[..hdr] != GZIP_HEADER {
        return Err(Error::corrupt("unrecognized trailer header"));
    }
    if get_u16_le(trailer, hdr)? != 4 {
        return Err(Error::corrupt("trailer extra field is not a 4-byte length"));
    }
    if trailer[hdr + 6..] != GZIP_EMPTY_BODY_AND_FOOTER {
        return Err(Error::corrupt("unrecognized trailer footer"));
    }
    Ok(get_u32_le(trailer, (TRAILER_SIZE - LENGTH_OFFSET_FROM_END) as usize)? as u64)
}

/// Reassemble the blob carried by a run of extra-field members (trailer
/// excluded).
pub fn unwrap_index(wrapped: &[u8]) -> Result<Vec<u8>> {
    let hdr = GZIP_HEADER_SIZE as usize;
    let ftr = GZIP_BODY_AND_FOOTER_SIZE as usize;
    let mut blob = Vec::with_capacity(wrapped.len());
    let mut pos = 0usize;

    while pos < wrapped.len() {
        let header = wrapped
            .get(pos..pos + hdr)
            .ok_or_else(|| Error::corrupt(format!("truncated index member header at {}", pos)))?;
        if header != GZIP_HEADER {
            return Err(Error::corrupt(format!("bad index member header at {}", pos)));
        }
        pos += hdr;

        let xlen = get_u16_le(wrapped, pos)? as usize;
        pos += XLEN_SIZE as usize;

        let payload = wrapped
            .get(pos..pos + xlen)
            .ok_or_else(|| Error::corrupt(format!("truncated index payload at {}", pos)))?;
        blob.extend_from_slice(payload);
        pos += xlen;

        let footer = wrapped
            .get(pos..pos + ftr)
            .ok_or_else(|| Error::corrupt(format!("truncated index member footer at {}", pos)))?;
        if footer != GZIP_EMPTY_BODY_AND_FOOTER {
            return Err(Error::corrupt(format!("bad index member footer at {}", pos)));
        }
        pos += ftr;
    }

    Ok(blob)
}
