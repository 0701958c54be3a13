//! Error types for the metrics registry.

use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur when registering or looking up metrics.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("metric already registered: {0}")]
    Duplicate(String),

    #[error("metric {name} is registered as a {actual}, not a {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
}
