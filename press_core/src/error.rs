use std::io;
use thiserror::Error;

/// Result type for press operations
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for compression, index loading, and random reads.
///
/// End of data is deliberately absent: a read past the last byte is reported
/// through [`crate::reader::ReadOutcome`], never as an error.
#[derive(Debug, Error)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Compression backend not found: {0}")]
    BackendNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // Format errors
    #[error("Corrupt artifact: {0}")]
    Corrupt(String),

    // Codec errors
    #[error("Backend failure: {0}")]
    Backend(String),
}

impl Error {
    /// Shorthand for [`Error::Corrupt`].
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Error::Corrupt(msg.into())
    }

    /// True for errors caused by a malformed artifact.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Error::Corrupt(_))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::Corrupt(_) => io::Error::new(io::ErrorKind::InvalidData, err),
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
