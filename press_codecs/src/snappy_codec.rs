use press_core::codec::Codec;
use press_core::{Error, Result};

/// Raw (unframed) Snappy codec.
///
/// Comparable speed to LZ4 with a slightly worse ratio; kept for artifacts
/// produced by Snappy-only pipelines.
pub struct SnappyCodec;

impl Codec for SnappyCodec {
    fn name(&self) -> &'static str {
        "snappy"
    }

    fn compress_block(&self, raw: &[u8]) -> Result<Vec<u8>> {
        snap::raw::Encoder::new()
            .compress_vec(raw)
            .map_err(|e| Error::Backend(format!("snappy compress error: {}", e)))
    }

    fn decompress_block(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        snap::raw::Decoder::new()
            .decompress_vec(compressed)
            .map_err(|e| Error::corrupt(format!("snappy decompress error: {}", e)))
    }
}
