//! Error types for the time-series client.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// A point failed validation and was not built.
#[derive(Debug, Error, PartialEq)]
pub enum PointError {
    #[error("series name is empty")]
    EmptySeries,

    #[error("point has no fields")]
    NoFields,

    #[error("field key is empty")]
    EmptyFieldKey,

    #[error("tag key is empty")]
    EmptyTagKey,

    #[error("field {key} has unsupported value {value}")]
    NonFiniteField { key: String, value: f64 },
}

/// Errors raised while constructing a client or talking to the store.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid address {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("unknown precision: {0}")]
    UnknownPrecision(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Point(#[from] PointError),
}
