//! Pool error types.

use dblink_driver::DriverError;
use thiserror::Error;

/// Errors that can occur while acquiring from or configuring a pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Every candidate within the retry budget failed validation.
    #[error("could not get a good connection to the database")]
    NoGoodConnection,

    /// The pool has been shut down.
    #[error("pool is closed")]
    PoolClosed,

    /// Invalid pool configuration.
    #[error("invalid pool configuration: {0}")]
    Config(String),

    /// Failure from the underlying driver (e.g. opening a connection).
    #[error(transparent)]
    Driver(#[from] DriverError),
}
