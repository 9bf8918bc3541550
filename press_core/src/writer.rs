use std::io::{BufWriter, Read, Write};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, trace, warn};

use crate::codec::Codec;
use crate::config::CompressionConfig;
use crate::container::{gzip_compress, wrap_index, INDEX_GZIP_LEVEL};
use crate::error::{Error, Result};
use crate::format::BlockIndex;

/// Totals reported by [`Writer::compress`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressSummary {
    /// Blocks written, including a trailing empty block.
    pub blocks: u64,
    /// Raw bytes consumed from the input.
    pub raw_bytes: u64,
    /// Bytes of compressed block payload (trailer excluded).
    pub compressed_bytes: u64,
    /// Total artifact length: payload + wrapped index + trailer.
    pub artifact_bytes: u64,
}

/// Parallel block compressor producing the container layout.
///
/// # Format layout written
/// ```text
/// [BLOCK 0] [BLOCK 1] ... [BLOCK N-1]      ← independent compressed blocks
/// [WRAPPED INDEX]                          ← gzipped index in empty gzip members
/// [TRAILER: 26 bytes]                      ← empty gzip member holding the index length
/// ```
///
/// Blocks are read in batches of `worker_count`. Each batch is compressed on a
/// pool of exactly `worker_count` threads and written back in ordinal order, so
/// the artifact is byte-identical whatever the thread timing was.
pub struct Writer {
    codec: Arc<dyn Codec>,
    config: CompressionConfig,
    pool: ThreadPool,
}

impl Writer {
    /// Validate `config` and spin up the worker pool.
    pub fn new(codec: Arc<dyn Codec>, config: CompressionConfig) -> Result<Self> {
        let config = config.validate()?;
        let pool = worker_pool(config.worker_count)?;
        Ok(Self { codec, config, pool })
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Compress all of `input` into `output`.
    ///
    /// The first block shorter than `block_size` (possibly empty) ends the
    /// artifact, so an empty input still produces one empty block. The first
    /// failing block aborts the run after its batch has drained; whatever was
    /// already written stays in `output`.
    pub fn compress<R: Read, W: Write>(&self, mut input: R, output: W) -> Result<CompressSummary> {
        let block_size = self.config.block_size as usize;
        let workers = self.config.worker_count;
        let mut out = BufWriter::new(output);
        let mut index = BlockIndex::new(self.config.checksums);
        let mut summary = CompressSummary::default();

        loop {
            let mut batch: Vec<Vec<u8>> = Vec::with_capacity(workers);
            let mut terminal = false;
            while batch.len() < workers {
                let raw = read_block(&mut input, block_size)?;
                terminal = raw.len() < block_size;
                batch.push(raw);
                if terminal {
                    break;
                }
            }

            let codec = &self.codec;
            let results: Vec<Result<Vec<u8>>> = self
                .pool
                .install(|| batch.par_iter().map(|raw| codec.compress_block(raw)).collect());

            let first = index.block_count();
            for (i, (raw, result)) in batch.iter().zip(results).enumerate() {
                let compressed = result.inspect_err(|e| {
                    warn!(block = first + i, codec = codec.name(), error = %e, "block compression failed");
                })?;
                out.write_all(&compressed)?;
                index.push(&compressed)?;
                summary.raw_bytes += raw.len() as u64;
                summary.compressed_bytes += compressed.len() as u64;
                trace!(block = first + i, raw = raw.len(), compressed = compressed.len(), "block written");
            }
            debug!(first_block = first, blocks = batch.len(), terminal, "batch written");

            if terminal {
                index.last_block_raw_size = batch.last().map_or(0, |raw| raw.len() as u32);
                break;
            }
        }

        let trailer = wrap_index(&gzip_compress(&index.to_bytes(), INDEX_GZIP_LEVEL)?);
        out.write_all(&trailer)?;
        out.flush()?;

        summary.blocks = index.block_count() as u64;
        summary.artifact_bytes = summary.compressed_bytes + trailer.len() as u64;
        debug!(
            blocks = summary.blocks,
            raw = summary.raw_bytes,
            artifact = summary.artifact_bytes,
            "compression finished"
        );
        Ok(summary)
    }
}

/// Read up to `block_size` bytes, stopping early only at end of input.
fn read_block<R: Read>(input: &mut R, block_size: usize) -> Result<Vec<u8>> {
    let mut raw = Vec::with_capacity(block_size);
    input.by_ref().take(block_size as u64).read_to_end(&mut raw)?;
    Ok(raw)
}

/// Fixed-size pool shared by the batch compressor and the read fan-out.
pub(crate) fn worker_pool(workers: usize) -> Result<ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("press-worker-{}", i))
        .build()
        .map_err(|e| Error::Config(format!("cannot start {} workers: {}", workers, e)))
}
