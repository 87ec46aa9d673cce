//! The crate's error surface.
//!
//! [`MarcError`] covers four failure domains: stream framing
//! (`StreamInit`, `UnexpectedEof`, `EndOfStream`, `IoError`), record
//! deserialization (`InvalidLeader`, `InvalidTag`, `DirectoryMismatch`),
//! pattern compilation (`InvalidPattern`), and positional access
//! (`OutOfRange`). Serialization adds `InvalidField` for fields too large
//! for a directory entry. [`Result`] is the usual alias.

use thiserror::Error;

/// Error type for all MARC library operations.
///
/// Structural defects that make a record unusable (`InvalidLeader`,
/// `InvalidTag`, `DirectoryMismatch`) are fatal to that record; recoverable
/// anomalies never surface here — they are appended as plain-text warnings
/// to the [`Record`](crate::Record) being built.
#[derive(Error, Debug)]
pub enum MarcError {
    /// Error opening or sizing the underlying byte stream.
    #[error("Failed to initialize MARC stream: {0}")]
    StreamInit(#[source] std::io::Error),

    /// The stream ended mid-record after a record terminator was observed.
    #[error("Unexpected end of stream: {0}")]
    UnexpectedEof(String),

    /// Error indicating an invalid leader (24-byte header).
    #[error("Invalid leader: {0}")]
    InvalidLeader(String),

    /// Error indicating a directory entry with a non-numeric tag.
    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    /// The directory entry count disagrees with the field payload count.
    #[error("Directory mismatch: {0}")]
    DirectoryMismatch(String),

    /// A field cannot be represented within ISO 2709 directory limits.
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// An extraction pattern failed to compile.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern substring.
        pattern: String,
        /// Human-readable reason the pattern was rejected.
        reason: String,
    },

    /// A positional access fell outside the valid range.
    #[error("Index {index} out of range (length {len})")]
    OutOfRange {
        /// The requested index.
        index: usize,
        /// The length of the indexed collection.
        len: usize,
    },

    /// The reader is exhausted; it is single-use.
    #[error("Stream is exhausted; the reader is single-use")]
    EndOfStream,

    /// IO error from the underlying source/destination.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Convenience type alias for [`std::result::Result`] with [`MarcError`].
pub type Result<T> = std::result::Result<T, MarcError>;
