use press_core::codec::Codec;
use press_core::container::{gzip_compress, gzip_decompress};
use press_core::Result;

/// One gzip member per block.
///
/// Level 0 stores the block verbatim inside a valid gzip member, so even the
/// "store" mode produces an artifact any gzip tool can read.
///
/// Best for: interoperability with stock gzip tooling.
pub struct GzipCodec {
    /// Deflate level (0 = store, 9 = smallest).
    pub level: u32,
}

impl GzipCodec {
    pub fn new(level: u32) -> Self {
        Self { level: level.min(9) }
    }
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl Codec for GzipCodec {
    fn name(&self) -> &'static str {
        match self.level {
            0 => "gzip-store",
            1..=5 => "gzip-fast",
            6..=8 => "gzip",
            _ => "gzip-max",
        }
    }

    fn compress_block(&self, raw: &[u8]) -> Result<Vec<u8>> {
        gzip_compress(raw, self.level)
    }

    fn decompress_block(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        gzip_decompress(compressed)
    }
}
