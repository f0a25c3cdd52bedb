//! Error types for the telemetry cache
//!
//! This module defines the common error type used by the model and time codecs.

use thiserror::Error;

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot parse time '{input}': {reason}")]
    TimeParse { input: String, reason: String },

    #[error("invalid time interval: start {start} is not before stop {stop}")]
    InvalidInterval { start: String, stop: String },

    #[error("frame sample has no ERT set")]
    MissingErt,

    #[error("time out of range: {0}")]
    OutOfRange(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a time parse error
    pub fn time_parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TimeParse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error came from a malformed time string
    #[must_use]
    pub const fn is_parse_error(&self) -> bool {
        matches!(self, Self::TimeParse { .. })
    }
}
