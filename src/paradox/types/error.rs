//! Custom error types for the paradox-reader crate.

use std::path::PathBuf;
use thiserror::Error;

use super::filetypes::ParadoxFormat;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum ParadoxError {
    /// The file could not be read from disk.
    #[error("I/O error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The buffer is below the minimum prefix size for the requested format.
    #[error("{format} buffer too small: got {got} bytes, need at least {minimum}")]
    TooSmall {
        format: ParadoxFormat,
        got: usize,
        minimum: usize,
    },

    /// The table-view signature did not match.
    #[error("invalid signature: expected {expected:?}, found {found:?}")]
    InvalidSignature { expected: String, found: String },

    /// The field-info section runs past the declared header area.
    #[error("field descriptors exceed the header area")]
    MissingFieldDescriptors,

    /// The header declares a record size of zero.
    #[error("header declares a record size of zero")]
    InvalidRecordSize,

    /// A bounds-checked read asked for more bytes than remain.
    #[error("out of bounds: requested {requested} bytes with {remaining} remaining")]
    OutOfBounds { requested: usize, remaining: usize },

    /// The dispatcher has no decoder for the requested format.
    #[error("no decoder for format {format}")]
    UnsupportedFormat { format: ParadoxFormat },
}

/// A convenience `Result` type alias using the crate's `ParadoxError` type.
pub type Result<T> = std::result::Result<T, ParadoxError>;
