pub mod bytes;
pub mod cache;
pub mod codec;
pub mod config;
pub mod container;
pub mod error;
pub mod format;
pub mod heuristic;
pub mod reader;
pub mod writer;

pub use codec::Codec;
pub use config::{CompressionConfig, Mode};
pub use error::{Error, Result};
pub use format::{BlockIndex, TRAILER_SIZE};
pub use heuristic::{compression_info, CompressionInfo};
pub use reader::{Decompressor, ReadOutcome};
pub use writer::{CompressSummary, Writer};
