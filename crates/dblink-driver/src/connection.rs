//! Connection and statement capability traits.
//!
//! These traits are the explicit capability set a pooled wrapper forwards
//! to. Implementations are free to use interior mutability; all methods
//! take `&self` so a connection can be shared behind an `Arc` while its
//! ownership migrates between successive pool handles.

use std::sync::Arc;

use crate::error::DriverError;

/// A live physical database connection.
///
/// The pool never inspects a connection beyond this surface. Errors from
/// any method are the driver's own failure type ([`DriverError`]), never a
/// wrapper-invented one.
pub trait DriverConnection: Send + Sync {
    /// Stable integer identity of this physical connection.
    ///
    /// Must not change over the connection's lifetime. Two distinct open
    /// connections must report distinct ids within one process.
    fn connection_id(&self) -> u64;

    /// Whether the physical connection has been closed.
    fn is_closed(&self) -> Result<bool, DriverError>;

    /// Whether the connection is in auto-commit mode.
    fn auto_commit(&self) -> Result<bool, DriverError>;

    /// Enable or disable auto-commit mode.
    fn set_auto_commit(&self, enabled: bool) -> Result<(), DriverError>;

    /// Commit the current transaction.
    fn commit(&self) -> Result<(), DriverError>;

    /// Roll back the current transaction.
    fn rollback(&self) -> Result<(), DriverError>;

    /// Create a statement for executing SQL text.
    fn create_statement(&self) -> Result<Box<dyn Statement + '_>, DriverError>;

    /// Close the physical connection.
    ///
    /// Closing an already-closed connection is a driver-defined no-op or
    /// error; callers on cleanup paths ignore the result either way.
    fn close(&self) -> Result<(), DriverError>;
}

/// A statement handle created from a [`DriverConnection`].
pub trait Statement {
    /// Execute a SQL statement, discarding any rows it produces.
    fn execute(&mut self, sql: &str) -> Result<(), DriverError>;
}

/// Shared reference to a physical connection.
///
/// The pool hands these between successive handles wrapping the same
/// physical connection, so the alias shows up throughout its API.
pub type SharedConnection = Arc<dyn DriverConnection>;
