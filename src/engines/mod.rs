//! Engine layer
//!
//! Byte-level I/O, the FASTA text codec and the temporary/chunked storage
//! containers the adapter hands out to callers.

pub mod core;
pub mod storage;

use std::io;
use std::path::Path;

use thiserror::Error;

/// Error type for adapter operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("No format registered for resource: {0}")]
    UnresolvedResource(String),

    #[error("Invalid resource pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl EngineError {
    /// Classify an I/O error raised while touching `path`
    pub fn from_io<P: AsRef<Path>>(err: io::Error, path: P) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => {
                EngineError::NotFound(path.as_ref().display().to_string())
            }
            io::ErrorKind::InvalidData => EngineError::Decode(format!(
                "{}: {}",
                path.as_ref().display(),
                err
            )),
            _ => EngineError::Io(err),
        }
    }
}

/// Result type for adapter operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Initialize the engine layer
pub fn initialize() {
    self::core::io::initialize();
}
