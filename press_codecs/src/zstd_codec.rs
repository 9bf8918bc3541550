use press_core::codec::Codec;
use press_core::{Error, Result};

/// Zstandard block codec.
///
/// Each block is compressed independently with `zstd` at the configured level
/// (default: 3). Because each block is independent, any block can be
/// decompressed without touching adjacent blocks.
///
/// Best for: general text, JSON, logs, mixed structured data.
pub struct ZstdCodec {
    /// Compression level (1 = fast / larger, 22 = slow / smallest).
    pub level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Codec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress_block(&self, raw: &[u8]) -> Result<Vec<u8>> {
        zstd::bulk::compress(raw, self.level)
            .map_err(|e| Error::Backend(format!("zstd compress error: {}", e)))
    }

    fn decompress_block(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        // The frame header carries the content size, so decode_all can size
        // its output without the index.
        zstd::decode_all(compressed).map_err(|e| Error::corrupt(format!("zstd decompress error: {}", e)))
    }
}
