//! Driver-level error types.

use thiserror::Error;

/// Errors reported by a driver or by wrappers forwarding to one.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The wrapper handle has been invalidated and may no longer be used.
    #[error("error accessing pooled connection: connection is invalid")]
    ConnectionInvalid,

    /// The physical connection has been closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Configuration problem (bad connection string, missing key, etc.).
    #[error("configuration error: {0}")]
    Config(String),

    /// Failure reported by the underlying database driver.
    #[error("driver error: {0}")]
    Driver(String),

    /// IO error while talking to the database.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
