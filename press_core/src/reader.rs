use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, trace};
use xxhash_rust::xxh3::xxh3_64;

use crate::cache::BlockCache;
use crate::codec::Codec;
use crate::config::CompressionConfig;
use crate::container::{gzip_decompress, parse_trailer, unwrap_index};
use crate::error::{Error, Result};
use crate::format::{BlockIndex, TRAILER_SIZE};
use crate::writer::worker_pool;

/// Result of one [`Decompressor::read_chunk`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Bytes copied into the caller's buffer.
    pub len: usize,
    /// The cursor has reached (or was already past) the last byte.
    pub eof: bool,
}

impl ReadOutcome {
    pub const END: ReadOutcome = ReadOutcome { len: 0, eof: true };
}

/// Index recovered from the tail of an artifact.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub index: BlockIndex,
    /// Length of the block payload region, i.e. where the wrapped index starts.
    pub payload_len: u64,
    /// Length of the wrapped index (trailer excluded).
    pub wrapped_len: u64,
}

/// Read the trailer, then the wrapped index in front of it, and decode the
/// block index. Costs two seeks and two reads however large the artifact is.
pub fn load_index<R: Read + Seek>(input: &mut R, total_size: u64, checksummed: bool) -> Result<LoadedIndex> {
    if total_size < TRAILER_SIZE {
        return Err(Error::corrupt(format!(
            "artifact is {} bytes, shorter than the {}-byte trailer",
            total_size, TRAILER_SIZE
        )));
    }

    // ── Trailer → wrapped index length ──────────────────────────────────
    input.seek(SeekFrom::Start(total_size - TRAILER_SIZE))?;
    let mut trailer = [0u8; TRAILER_SIZE as usize];
    read_exact_or_corrupt(input, &mut trailer, "trailer")?;
    let wrapped_len = parse_trailer(&trailer)?;

    let payload_len = (total_size - TRAILER_SIZE).checked_sub(wrapped_len).ok_or_else(|| {
        Error::corrupt(format!(
            "wrapped index claims {} bytes but only {} precede the trailer",
            wrapped_len,
            total_size - TRAILER_SIZE
        ))
    })?;

    // ── Wrapped index → flat index ──────────────────────────────────────
    input.seek(SeekFrom::Start(payload_len))?;
    let mut wrapped = vec![0u8; wrapped_len as usize];
    read_exact_or_corrupt(input, &mut wrapped, "wrapped index")?;
    let flat = gzip_decompress(&unwrap_index(&wrapped)?)?;
    let index = BlockIndex::from_bytes(&flat, checksummed)?;

    debug!(blocks = index.block_count(), payload_len, wrapped_len, "block index loaded");
    Ok(LoadedIndex { index, payload_len, wrapped_len })
}

fn read_exact_or_corrupt<R: Read>(input: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::corrupt(format!("truncated {}", what)),
        _ => Error::Io(e),
    })
}

/// Seekable, caching reader over a container artifact.
///
/// # Open sequence
/// 1. Seek to `total_size - 26`, validate the trailer, learn the wrapped index length.
/// 2. Seek in front of the trailer, read the wrapped index, unwrap and gunzip it.
/// 3. Prefix-sum the compressed sizes into block starts and derive the
///    decompressed size.
///
/// # Access pattern
/// A read maps the cursor to a run of blocks. Blocks already in the cache are
/// reused; the compressed span of the rest is fetched with one seek and one
/// read and decoded on the worker pool. Decoded blocks enter the cache in
/// ordinal order, so the cache contents depend only on the sequence of reads.
///
/// The cursor is a plain `i64` and may sit outside the data; reads from there
/// report end of data. A `Decompressor` is move-only: cursor and cache belong
/// to exactly one logical reader.
///
/// `io::Seek` rejects negative targets with `InvalidInput`; use
/// [`Decompressor::seek_cursor`] for a seek that never fails.
pub struct Decompressor<R> {
    input: R,
    codec: Arc<dyn Codec>,
    config: CompressionConfig,
    index: BlockIndex,
    block_starts: Vec<u64>,
    decompressed_size: u64,
    position: i64,
    cache: BlockCache,
    pool: ThreadPool,
}

impl<R: Read + Seek> Decompressor<R> {
    /// Open an artifact of `total_size` bytes.
    ///
    /// `codec` and `config` must match what the artifact was written with; a
    /// mismatched block size or checksum setting is reported as corruption.
    pub fn open(codec: Arc<dyn Codec>, config: CompressionConfig, mut input: R, total_size: u64) -> Result<Self> {
        let config = config.validate()?;
        let LoadedIndex { index, payload_len, .. } = load_index(&mut input, total_size, config.checksums)?;

        let block_starts = index.block_starts();
        let span = block_starts.last().copied().unwrap_or(0);
        if span != payload_len {
            return Err(Error::corrupt(format!(
                "index covers {} bytes of blocks but {} bytes precede it",
                span, payload_len
            )));
        }
        if index.last_block_raw_size > config.block_size {
            return Err(Error::corrupt(format!(
                "last block holds {} raw bytes, more than the {}-byte block size",
                index.last_block_raw_size, config.block_size
            )));
        }

        let decompressed_size = index.decompressed_size(config.block_size);
        let pool = worker_pool(config.worker_count)?;
        input.seek(SeekFrom::Start(0))?;

        Ok(Self {
            input,
            codec,
            config,
            index,
            block_starts,
            decompressed_size,
            position: 0,
            cache: BlockCache::default(),
            pool,
        })
    }

    /// Copy bytes at the cursor into `buf` and advance the cursor.
    ///
    /// `len` is bounded by what remains before `decompressed_size`; `eof` is
    /// set once the cursor reaches the end, including on the read that
    /// consumes the last byte.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        let size = self.decompressed_size;
        if self.position < 0 || self.position as u64 >= size {
            return Ok(ReadOutcome::END);
        }
        if buf.is_empty() {
            return Ok(ReadOutcome { len: 0, eof: false });
        }

        let pos = self.position as u64;
        let block_size = self.config.block_size as u64;
        let want = (buf.len() as u64).min(size - pos) as usize;
        let first = pos / block_size;
        let offset = (pos % block_size) as usize;
        let last = ((pos + want as u64 - 1) / block_size).min(self.block_count() - 1);

        let blocks = self.fetch_blocks(first, last)?;

        let mut copied = 0usize;
        let mut skip = offset;
        for block in &blocks {
            let data = block.get(skip..).unwrap_or_default();
            skip = 0;
            let n = data.len().min(want - copied);
            buf[copied..copied + n].copy_from_slice(&data[..n]);
            copied += n;
            if copied == want {
                break;
            }
        }
        if copied != want {
            return Err(Error::corrupt(format!(
                "blocks {}..={} yielded {} bytes, expected {}",
                first, last, copied, want
            )));
        }

        self.position += want as i64;
        Ok(ReadOutcome { len: want, eof: self.position as u64 >= size })
    }

    /// Decoded contents of blocks `first..=last`, in ordinal order.
    fn fetch_blocks(&mut self, first: u64, last: u64) -> Result<Vec<Arc<Vec<u8>>>> {
        let mut slots: Vec<Option<Arc<Vec<u8>>>> = (first..=last).map(|o| self.cache.get(o)).collect();
        let misses: Vec<u64> = (first..=last).filter(|&o| slots[(o - first) as usize].is_none()).collect();
        trace!(first, last, hits = slots.len() - misses.len(), misses = misses.len(), "block lookup");

        if let (Some(&lo), Some(&hi)) = (misses.first(), misses.last()) {
            let span_start = self.block_starts[lo as usize];
            let span_end = self.block_starts[hi as usize + 1];
            self.input.seek(SeekFrom::Start(span_start))?;
            let mut span = vec![0u8; (span_end - span_start) as usize];
            read_exact_or_corrupt(&mut self.input, &mut span, "block payload")?;

            let layout = BlockLayout {
                codec: self.codec.as_ref(),
                index: &self.index,
                starts: &self.block_starts,
                block_size: self.config.block_size,
                span_start,
                span: &span,
            };
            let decoded: Vec<Result<Vec<u8>>> =
                self.pool.install(|| misses.par_iter().map(|&o| layout.decode(o)).collect());

            for (ordinal, result) in misses.iter().zip(decoded) {
                let data = Arc::new(result?);
                self.cache.insert(*ordinal, Arc::clone(&data));
                slots[(ordinal - first) as usize] = Some(data);
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }

    /// Move the cursor. Never touches the artifact or the cache and never
    /// fails: positions outside the data are valid and read as end of data.
    pub fn seek_cursor(&mut self, pos: SeekFrom) -> i64 {
        self.position = match pos {
            SeekFrom::Start(n) => i64::try_from(n).unwrap_or(i64::MAX),
            SeekFrom::Current(delta) => self.position.saturating_add(delta),
            SeekFrom::End(delta) => (self.decompressed_size as i64).saturating_add(delta),
        };
        self.position
    }
}

impl<R> Decompressor<R> {
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Total number of blocks, including a trailing empty block.
    #[inline]
    pub fn block_count(&self) -> u64 {
        self.index.block_count() as u64
    }

    #[inline]
    pub fn block_size(&self) -> u32 {
        self.config.block_size
    }

    pub fn decompressed_size(&self) -> u64 {
        self.decompressed_size
    }

    /// Compressed bytes of all blocks (index and trailer excluded).
    pub fn compressed_size(&self) -> u64 {
        self.block_starts.last().copied().unwrap_or(0)
    }

    /// Compression ratio (raw / compressed).
    pub fn ratio(&self) -> f64 {
        let compressed = self.compressed_size();
        if compressed == 0 {
            return 1.0;
        }
        self.decompressed_size as f64 / compressed as f64
    }

    /// Byte range `[start, end)` of block `ordinal` within the artifact.
    pub fn block_span(&self, ordinal: u64) -> Option<(u64, u64)> {
        let i = usize::try_from(ordinal).ok()?;
        Some((*self.block_starts.get(i)?, *self.block_starts.get(i + 1)?))
    }

    pub fn index(&self) -> &BlockIndex {
        &self.index
    }

    pub fn codec_name(&self) -> &'static str {
        self.codec.name()
    }

    /// Ordinals currently cached, oldest first.
    pub fn cached_blocks(&self) -> Vec<u64> {
        self.cache.ordinals().collect()
    }

    pub fn into_inner(self) -> R {
        self.input
    }
}

impl<R: Read + Seek> Read for Decompressor<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_chunk(buf)?.len)
    }
}

impl<R: Read + Seek> Seek for Decompressor<R> {
    /// Negative targets are rejected per `io::Seek` convention, but the cursor
    /// still moves there, so the next read reports end of data.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = self.seek_cursor(pos);
        u64::try_from(target).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("seek to negative position {}", target))
        })
    }
}

/// Read-only view handed to the decode workers.
struct BlockLayout<'a> {
    codec: &'a dyn Codec,
    index: &'a BlockIndex,
    starts: &'a [u64],
    block_size: u32,
    span_start: u64,
    span: &'a [u8],
}

impl BlockLayout<'_> {
    fn decode(&self, ordinal: u64) -> Result<Vec<u8>> {
        let i = ordinal as usize;
        let lo = (self.starts[i] - self.span_start) as usize;
        let hi = (self.starts[i + 1] - self.span_start) as usize;
        let compressed = &self.span[lo..hi];

        if let Some(sums) = &self.index.checksums {
            let computed = xxh3_64(compressed);
            if computed != sums[i] {
                return Err(Error::corrupt(format!(
                    "block {} checksum mismatch: expected {:016x}, got {:016x}",
                    ordinal, sums[i], computed
                )));
            }
        }

        let raw = self.codec.decompress_block(compressed)?;
        let expected = if i + 1 == self.index.block_count() {
            self.index.last_block_raw_size as usize
        } else {
            self.block_size as usize
        };
        if raw.len() != expected {
            return Err(Error::corrupt(format!(
                "block {} decompressed to {} bytes but index says {}",
                ordinal,
                raw.len(),
                expected
            )));
        }
        Ok(raw)
    }
}
