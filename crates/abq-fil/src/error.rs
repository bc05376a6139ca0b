//! Error types for abq-fil
//!
//! Physical-layer errors (markers, block payloads) report byte offsets into
//! the source. Logical-layer errors report word offsets into the word stream
//! formed by concatenating block payloads.

use std::io;
use std::sync::Arc;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilError>;

/// The opening bytes do not look like a `.fil` file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Undetermined encoding: no marker width/byte order fits the first {inspected} bytes")]
    UndeterminedEncoding { inspected: usize },
}

/// Framing or schema violations found while walking the record stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Marker mismatch at byte {offset}: leading {leading}, trailing {trailing}")]
    MarkerMismatch {
        offset: u64,
        leading: u64,
        trailing: u64,
    },

    #[error("Truncated stream in {context} at offset {offset}")]
    Truncated { offset: u64, context: &'static str },

    #[error("Schema mismatch: key {key} does not accept a record of {length} words")]
    SchemaMismatch { key: i64, length: usize },

    #[error("Unknown record key {key} at word {offset}")]
    UnknownKey { key: i64, offset: u64 },

    #[error("Bad record length {length} at word {offset}")]
    BadRecordLength { offset: u64, length: i64 },

    #[error("Bad block marker {marker} at byte {offset} (max {max_words} words per block)")]
    BadBlockLength {
        offset: u64,
        marker: u64,
        max_words: usize,
    },
}

/// Top-level error for a decode session.
///
/// Cloneable so a failed session can report the same error on every
/// subsequent pull.
#[derive(Error, Debug, Clone)]
pub enum FilError {
    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(Arc<serde_json::Error>),
}

impl From<io::Error> for FilError {
    fn from(err: io::Error) -> Self {
        FilError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for FilError {
    fn from(err: serde_json::Error) -> Self {
        FilError::Json(Arc::new(err))
    }
}

impl FilError {
    pub fn as_decode(&self) -> Option<&DecodeError> {
        match self {
            FilError::Decode(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self, FilError::Decode(DecodeError::Truncated { .. }))
    }
}
