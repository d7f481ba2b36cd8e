//! Centralized error types for quotechain.
//!
//! The decoding entry points never surface these to callers: every decode
//! failure is recovered into a sentinel or a coarser structure. They are
//! returned by the internal fallible steps and by the file-reading edge.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the quotechain library.
#[derive(Error, Debug)]
pub enum QuoteChainError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The input cannot be processed (e.g. a batch target that is not a directory).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A base64 body could not be decoded.
    #[error("Invalid base64 content: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Decoded bytes are not valid UTF-8.
    #[error("Invalid UTF-8 content: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The character encoding is not supported.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),
}

/// Convenience alias for `Result<T, QuoteChainError>`.
pub type Result<T> = std::result::Result<T, QuoteChainError>;

impl QuoteChainError {
    /// Create an `Io` variant from a path and an `io::Error`.
    ///
    /// `NotFound` is mapped to [`QuoteChainError::FileNotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path)
        } else {
            Self::Io { path, source }
        }
    }
}
