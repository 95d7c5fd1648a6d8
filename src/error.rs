//! Error taxonomy for the codec.
//!
//! Internal routines return [`CodecError`]; the public reader/writer
//! constructors surface `anyhow::Result` at the crate boundary, matching the
//! pattern used throughout the rest of the workspace. Only conditions
//! classified as "Fatal" become an `Err` here — record-level skips and
//! field-level warn-and-drops are represented as `Ok` with a diagnostic
//! logged on the way, never as an error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to open input")]
    Open(#[source] std::io::Error),

    #[error("failed to read from stream")]
    Read(#[source] std::io::Error),

    #[error("failed to write to stream")]
    Write(#[source] std::io::Error),

    #[error("truncated record: expected {expected} bytes, got {got}")]
    TruncatedRecord { expected: usize, got: usize },

    #[error("bad magic: expected \"BCF\\x02\", found {0:?}")]
    BadMagic(Vec<u8>),

    #[error("malformed typed-value descriptor")]
    BadDescriptor,

    #[error("header is missing the #CHROM column line")]
    MissingColumnHeader,

    #[error("field contains invalid UTF-8")]
    InvalidUtf8(#[source] std::str::Utf8Error),

    #[error("invalid integer literal: {0:?}")]
    InvalidInt(String),

    #[error("invalid float literal: {0:?}")]
    InvalidFloat(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
