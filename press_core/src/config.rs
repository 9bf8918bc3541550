use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Default heuristic sample: 1 MiB.
pub const DEFAULT_HEURISTIC_BYTES: u64 = 1024 * 1024;

/// Default worker pool size.
pub const DEFAULT_WORKER_COUNT: usize = 12;

/// Default ratio (compressed / raw) above which data counts as incompressible.
pub const DEFAULT_MAX_COMPRESSION_RATIO: f64 = 0.9;

/// Extension suggested for data that is not worth compressing.
pub const INCOMPRESSIBLE_EXTENSION: &str = ".bin";

/// Backend algorithm used for every block of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Gzip level 0: blocks are stored, not deflated.
    GzipStore,
    GzipMin,
    GzipDefault,
    GzipMax,
    /// External `xz -c1`, output stored in a level-0 gzip member.
    XzMin,
    /// External `xz -c`, output stored in a level-0 gzip member.
    Xz,
    Lz4,
    Snappy,
    Zstd,
}

impl Mode {
    pub const ALL: [Mode; 9] = [
        Mode::GzipStore,
        Mode::GzipMin,
        Mode::GzipDefault,
        Mode::GzipMax,
        Mode::XzMin,
        Mode::Xz,
        Mode::Lz4,
        Mode::Snappy,
        Mode::Zstd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Mode::GzipStore => "gzip-store",
            Mode::GzipMin => "gzip-min",
            Mode::GzipDefault => "gzip-default",
            Mode::GzipMax => "gzip-max",
            Mode::XzMin => "xz-min",
            Mode::Xz => "xz",
            Mode::Lz4 => "lz4",
            Mode::Snappy => "snappy",
            Mode::Zstd => "zstd",
        }
    }

    /// File extension for artifacts written in this mode.
    pub fn extension(self) -> &'static str {
        match self {
            Mode::GzipStore | Mode::GzipMin | Mode::GzipDefault | Mode::GzipMax => ".gz",
            Mode::XzMin | Mode::Xz => ".xzgz",
            Mode::Lz4 => ".lz4",
            Mode::Snappy => ".snap",
            Mode::Zstd => ".zst",
        }
    }

    /// Gzip level for the gzip-backed modes.
    pub fn gzip_level(self) -> Option<u32> {
        match self {
            Mode::GzipStore => Some(0),
            Mode::GzipMin => Some(1),
            Mode::GzipDefault => Some(6),
            Mode::GzipMax => Some(9),
            _ => None,
        }
    }

    /// Command name of the external backend, for modes that run one.
    pub fn external_command(self) -> Option<&'static str> {
        match self {
            Mode::XzMin | Mode::Xz => Some("xz"),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Mode::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| {
                let valid: Vec<_> = Mode::ALL.iter().map(|m| m.name()).collect();
                Error::Config(format!("unknown mode '{}'. Valid options: {}", s, valid.join(", ")))
            })
    }
}

/// Everything an engine or reader needs to know about how an artifact is laid out.
///
/// Built with [`CompressionConfig::new`] plus `with_*` setters, then checked by
/// [`CompressionConfig::validate`]; facades validate before first use, so an
/// instance that made it into an engine never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionConfig {
    pub mode: Mode,
    /// Raw bytes per block (the last block may be smaller).
    pub block_size: u32,
    /// Prefix length sampled by the compressibility heuristic.
    pub heuristic_bytes: u64,
    /// Size of the worker pool used for compression and read fan-out.
    pub worker_count: usize,
    /// Compressed/raw ratio above which data is treated as incompressible.
    pub max_compression_ratio: f64,
    /// Explicit path to the external backend binary. Resolved from `PATH` by
    /// [`CompressionConfig::validate`] when left unset.
    pub backend_path: Option<PathBuf>,
    /// Store an xxh3-64 of every compressed block in the index and verify it on read.
    pub checksums: bool,
}

impl CompressionConfig {
    pub fn new(mode: Mode, block_size: u32) -> Self {
        Self {
            mode,
            block_size,
            heuristic_bytes: DEFAULT_HEURISTIC_BYTES,
            worker_count: DEFAULT_WORKER_COUNT,
            max_compression_ratio: DEFAULT_MAX_COMPRESSION_RATIO,
            backend_path: None,
            checksums: false,
        }
    }

    pub fn with_heuristic_bytes(mut self, bytes: u64) -> Self {
        self.heuristic_bytes = bytes;
        self
    }

    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    pub fn with_max_compression_ratio(mut self, ratio: f64) -> Self {
        self.max_compression_ratio = ratio;
        self
    }

    pub fn with_backend_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.backend_path = Some(path.into());
        self
    }

    pub fn with_checksums(mut self, enabled: bool) -> Self {
        self.checksums = enabled;
        self
    }

    /// Check the invariants and, for external modes, resolve the backend binary.
    pub fn validate(mut self) -> Result<Self> {
        if self.block_size == 0 {
            return Err(Error::Config("block size must be greater than 0".into()));
        }
        if self.worker_count == 0 {
            return Err(Error::Config("worker count must be greater than 0".into()));
        }
        if self.heuristic_bytes == 0 {
            return Err(Error::Config("heuristic sample must be greater than 0 bytes".into()));
        }
        if !(self.max_compression_ratio > 0.0) {
            return Err(Error::Config(format!(
                "max compression ratio must be positive, got {}",
                self.max_compression_ratio
            )));
        }

        if let Some(command) = self.mode.external_command() {
            let resolved = match self.backend_path.take() {
                Some(path) if path.is_file() => path,
                Some(path) => {
                    return Err(Error::BackendNotFound(format!(
                        "{} does not exist",
                        path.display()
                    )))
                }
                None => find_in_path(command).ok_or_else(|| {
                    Error::BackendNotFound(format!("'{}' not found in PATH", command))
                })?,
            };
            self.backend_path = Some(resolved);
        }
        Ok(self)
    }

    /// Resolved external backend, if this mode uses one.
    pub fn backend(&self) -> Option<&Path> {
        self.backend_path.as_deref()
    }
}

/// Look `command` up in the directories listed by `PATH`.
pub fn find_in_path(command: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .flat_map(|dir| {
            let plain = dir.join(command);
            let exe = dir.join(format!("{}{}", command, std::env::consts::EXE_SUFFIX));
            [plain, exe]
        })
        .find(|candidate| candidate.is_file())
}
