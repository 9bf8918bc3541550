mod external_codec;
mod gzip_codec;
mod lz4_codec;
mod snappy_codec;
mod zstd_codec;

pub use external_codec::ExternalCodec;
pub use gzip_codec::GzipCodec;
pub use lz4_codec::Lz4Codec;
pub use snappy_codec::SnappyCodec;
pub use zstd_codec::ZstdCodec;

use std::io::{Read, Seek, Write};
use std::sync::Arc;

use press_core::{
    compression_info, Codec, CompressSummary, CompressionConfig, CompressionInfo, Decompressor, Error, Mode,
    Result, Writer,
};

/// Resolve the codec for a configuration's mode.
///
/// External modes need `config.backend_path` to be resolved already, which
/// [`CompressionConfig::validate`] does.
pub fn codec_for(config: &CompressionConfig) -> Result<Arc<dyn Codec>> {
    Ok(match config.mode {
        Mode::GzipStore | Mode::GzipMin | Mode::GzipDefault | Mode::GzipMax => {
            Arc::new(GzipCodec::new(config.mode.gzip_level().unwrap_or(6)))
        }
        Mode::XzMin | Mode::Xz => {
            let binary = config.backend().ok_or_else(|| {
                Error::BackendNotFound(format!("no backend binary resolved for mode {}", config.mode))
            })?;
            Arc::new(ExternalCodec::xz(binary, config.mode == Mode::XzMin))
        }
        Mode::Lz4 => Arc::new(Lz4Codec),
        Mode::Snappy => Arc::new(SnappyCodec),
        Mode::Zstd => Arc::new(ZstdCodec::default()),
    })
}

/// File-level entry point: one validated configuration plus its codec.
///
/// Construction fails fast on an invalid configuration or a missing external
/// backend; afterwards every method is a thin wrapper over the core engine,
/// reader, and heuristic.
#[derive(Clone)]
pub struct Compression {
    config: CompressionConfig,
    codec: Arc<dyn Codec>,
}

impl Compression {
    pub fn new(config: CompressionConfig) -> Result<Self> {
        let config = config.validate()?;
        let codec = codec_for(&config)?;
        Ok(Self { config, codec })
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    pub fn codec(&self) -> Arc<dyn Codec> {
        Arc::clone(&self.codec)
    }

    /// Extension for artifacts written with this configuration.
    pub fn file_extension(&self) -> &'static str {
        self.config.mode.extension()
    }

    /// Compress all of `input` into `output`.
    pub fn compress_file<R: Read, W: Write>(&self, input: R, output: W) -> Result<CompressSummary> {
        Writer::new(self.codec(), self.config.clone())?.compress(input, output)
    }

    /// Open an artifact of `total_size` bytes for random access.
    ///
    /// Returns the reader and its decompressed size.
    pub fn decompress_file<R: Read + Seek>(&self, input: R, total_size: u64) -> Result<(Decompressor<R>, u64)> {
        let reader = Decompressor::open(self.codec(), self.config.clone(), input, total_size)?;
        let size = reader.decompressed_size();
        Ok((reader, size))
    }

    /// Run the compressibility heuristic on the start of `reader`.
    pub fn compression_info<R: Read>(&self, reader: R) -> Result<CompressionInfo> {
        compression_info(self.codec.as_ref(), &self.config, reader)
    }
}
