//! Error types for the reporter.

use metricflux_client::{ClientError, PointError};
use thiserror::Error;

/// Result type alias for reporter operations.
pub type ReporterResult<T> = Result<T, ReporterError>;

/// Errors raised by the reporter.
///
/// Only `Config` and a `Connection` error while building the first client
/// stop the reporter; everything else is logged and the loop moves on.
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("connection error: {0}")]
    Connection(#[source] ClientError),

    #[error("write error: {0}")]
    Write(#[source] ClientError),

    #[error("point construction error: {0}")]
    PointConstruction(#[from] PointError),
}
