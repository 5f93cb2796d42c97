use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Byte source error: {0}")]
    Source(#[from] SourceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Sink(#[from] anyhow::Error),
}

/// Failures reported by a [`crate::source::ByteSource`].
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("byte source closed")]
    Closed,

    #[error("read cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Outcome of a header scan that did not produce a header.
///
/// `NoData` and `Resync` are transient: the caller simply scans again.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("no data")]
    NoData,

    #[error("discarded undecodable line")]
    Resync,

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Payload-level failures. Every variant except `Cancelled` breaks framing for the
/// rest of the connection.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Truncated payload: expected {expected} {unit}, received {received}")]
    TruncatedPayload {
        expected: usize,
        received: usize,
        unit: &'static str,
    },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Declared {what} of {declared} exceeds the configured limit of {limit}")]
    LimitExceeded {
        what: &'static str,
        declared: usize,
        limit: usize,
    },

    #[error("Decode cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn config(msg: impl Into<String>) -> Self {
        AppError::Config(msg.into())
    }
}

impl DecodeError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        DecodeError::MalformedPayload(msg.into())
    }

    pub fn dimension_mismatch(msg: impl Into<String>) -> Self {
        DecodeError::DimensionMismatch(msg.into())
    }

    pub fn truncated(expected: usize, received: usize) -> Self {
        DecodeError::TruncatedPayload {
            expected,
            received,
            unit: "bytes",
        }
    }

    pub fn truncated_lines(expected: usize, received: usize) -> Self {
        DecodeError::TruncatedPayload {
            expected,
            received,
            unit: "lines",
        }
    }

    /// True for the payload-shape failures that end a session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DecodeError::Cancelled)
    }
}
