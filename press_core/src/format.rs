use crate::bytes::{get_u32_le, get_u64_le, put_u32_le, put_u64_le};
use crate::error::{Error, Result};

// ── Gzip member templates ──────────────────────────────────────────────────

/// Gzip header with FEXTRA set (flags = 0x04, mtime = 0, xfl = 0, os = Unix).
/// Every metadata member written after the compressed blocks starts with it.
pub const GZIP_HEADER: [u8; 10] = [0x1f, 0x8b, 0x08, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03];

/// Empty deflate body (one final fixed-Huffman block) followed by CRC32 = 0
/// and ISIZE = 0.
pub const GZIP_EMPTY_BODY_AND_FOOTER: [u8; 10] =
    [0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

pub const GZIP_HEADER_SIZE: u64 = GZIP_HEADER.len() as u64;
pub const GZIP_BODY_AND_FOOTER_SIZE: u64 = GZIP_EMPTY_BODY_AND_FOOTER.len() as u64;

/// Width of the XLEN field that precedes the extra payload.
pub const XLEN_SIZE: u64 = 2;

/// Largest extra payload one gzip member can carry.
pub const MAX_EXTRA_PAYLOAD: usize = u16::MAX as usize;

/// Fixed trailer: the final empty member, whose 4-byte extra field holds the
/// byte length of the wrapped index in front of it.
///   header[10] + xlen[2] + length:u32 + body_and_footer[10] = 26
pub const TRAILER_SIZE: u64 = GZIP_HEADER_SIZE + XLEN_SIZE + 4 + GZIP_BODY_AND_FOOTER_SIZE;

/// Distance of the trailer's length field from the end of the artifact.
pub const LENGTH_OFFSET_FROM_END: u64 = GZIP_BODY_AND_FOOTER_SIZE + 4;

// ── Index layout ───────────────────────────────────────────────────────────

/// Bytes per index entry in the plain layout: compressed_len:u32.
pub const BLOCK_ENTRY_SIZE: usize = 4;

/// Bytes per index entry in the checksummed layout:
/// compressed_len:u32 + xxh3_64(compressed):u64.
pub const CHECKSUMMED_ENTRY_SIZE: usize = 12;

/// Width of the terminal raw-size field closing the index.
pub const LAST_RAW_SIZE_FIELD: usize = 4;

/// Block index recovered from (or about to be written into) the trailer.
///
/// Offsets are never stored: block `i` starts at the sum of the compressed
/// sizes of blocks `0..i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockIndex {
    /// Compressed length of every block, in ordinal order.
    pub compressed_sizes: Vec<u32>,
    /// xxh3-64 of every compressed block; `Some` only for the checksummed layout.
    pub checksums: Option<Vec<u64>>,
    /// Raw length of the final block (0 when the input ended on a block boundary).
    pub last_block_raw_size: u32,
}

impl BlockIndex {
    pub fn new(checksummed: bool) -> Self {
        Self {
            compressed_sizes: Vec::new(),
            checksums: checksummed.then(Vec::new),
            last_block_raw_size: 0,
        }
    }

    /// Record one compressed block. `compressed` is only hashed in the
    /// checksummed layout.
    pub fn push(&mut self, compressed: &[u8]) -> Result<()> {
        let len = u32::try_from(compressed.len()).map_err(|_| {
            Error::Backend(format!(
                "compressed block of {} bytes does not fit the u32 index field",
                compressed.len()
            ))
        })?;
        self.compressed_sizes.push(len);
        if let Some(sums) = self.checksums.as_mut() {
            sums.push(xxhash_rust::xxh3::xxh3_64(compressed));
        }
        Ok(())
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.compressed_sizes.len()
    }

    pub fn is_checksummed(&self) -> bool {
        self.checksums.is_some()
    }

    /// Cumulative block starts; `len() == block_count() + 1`, the last value is
    /// the total compressed span.
    pub fn block_starts(&self) -> Vec<u64> {
        let mut starts = Vec::with_capacity(self.compressed_sizes.len() + 1);
        let mut pos = 0u64;
        starts.push(pos);
        for &size in &self.compressed_sizes {
            pos += size as u64;
            starts.push(pos);
        }
        starts
    }

    /// `(block_count - 1) * block_size + last_block_raw_size`.
    pub fn decompressed_size(&self, block_size: u32) -> u64 {
        let full = self.compressed_sizes.len().saturating_sub(1) as u64;
        full * block_size as u64 + self.last_block_raw_size as u64
    }

    /// Serialize to the flat little-endian layout stored (gzipped) in the trailer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let width = if self.is_checksummed() { CHECKSUMMED_ENTRY_SIZE } else { BLOCK_ENTRY_SIZE };
        let mut buf = Vec::with_capacity(self.block_count() * width + LAST_RAW_SIZE_FIELD);
        for (i, &size) in self.compressed_sizes.iter().enumerate() {
            put_u32_le(&mut buf, size);
            if let Some(sums) = &self.checksums {
                put_u64_le(&mut buf, sums[i]);
            }
        }
        put_u32_le(&mut buf, self.last_block_raw_size);
        buf
    }

    /// Parse the flat layout, checking that its length matches the entry width.
    pub fn from_bytes(buf: &[u8], checksummed: bool) -> Result<Self> {
        let width = if checksummed { CHECKSUMMED_ENTRY_SIZE } else { BLOCK_ENTRY_SIZE };
        if buf.len() < width + LAST_RAW_SIZE_FIELD
            || (buf.len() - LAST_RAW_SIZE_FIELD) % width != 0
        {
            return Err(Error::corrupt(format!(
                "block index is {} bytes, expected {}*n + {} with n >= 1",
                buf.len(),
                width,
                LAST_RAW_SIZE_FIELD
            )));
        }

        let count = (buf.len() - LAST_RAW_SIZE_FIELD) / width;
        let mut index = Self::new(checksummed);
        index.compressed_sizes.reserve(count);
        for i in 0..count {
            let at = i * width;
            index.compressed_sizes.push(get_u32_le(buf, at)?);
            if let Some(sums) = index.checksums.as_mut() {
                sums.push(get_u64_le(buf, at + 4)?);
            }
        }
        index.last_block_raw_size = get_u32_le(buf, buf.len() - LAST_RAW_SIZE_FIELD)?;
        Ok(index)
    }
}
