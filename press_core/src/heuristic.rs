use std::io::Read;

use tracing::debug;

use crate::codec::Codec;
use crate::config::{CompressionConfig, INCOMPRESSIBLE_EXTENSION};
use crate::error::Result;

/// Verdict of the prefix-sampling heuristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionInfo {
    pub compressible: bool,
    /// Mode extension when compressible, `.bin` otherwise.
    pub extension: &'static str,
    /// Compressed / raw size of the sampled prefix.
    pub ratio: f64,
}

/// Compress the first `heuristic_bytes` of `reader` with `codec` and decide
/// whether full compression is worth it.
///
/// An input shorter than the sample size fails with the reader's
/// `UnexpectedEof` I/O error.
pub fn compression_info<R: Read>(
    codec: &dyn Codec,
    config: &CompressionConfig,
    mut reader: R,
) -> Result<CompressionInfo> {
    let mut sample = vec![0u8; config.heuristic_bytes as usize];
    reader.read_exact(&mut sample)?;

    let compressed = codec.compress_block(&sample)?;
    let ratio = compressed.len() as f64 / sample.len() as f64;
    let compressible = ratio <= config.max_compression_ratio;
    debug!(
        codec = codec.name(),
        sample = sample.len(),
        compressed = compressed.len(),
        ratio,
        compressible,
        "compressibility heuristic"
    );

    Ok(CompressionInfo {
        compressible,
        extension: if compressible { config.mode.extension() } else { INCOMPRESSIBLE_EXTENSION },
        ratio,
    })
}
