//! Per-checkout connection handles.
//!
//! A [`PooledHandle`] is the pool's internal record for one checkout (or
//! one idle slot) of a physical connection. The caller-facing side is
//! [`PooledConnection`], which shares the handle's validity flag: when the
//! pool retires a handle, every operation on the caller's wrapper starts
//! failing instead of touching a connection that now belongs to someone
//! else.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dblink_driver::{DriverError, SharedConnection, Statement};

use crate::pool::PoolInner;

/// Internal record for one checkout of a physical connection.
///
/// Exactly one live handle references a given physical connection at any
/// instant. Recycling or claiming the connection issues a fresh handle and
/// invalidates the previous one; an invalidated handle never becomes valid
/// again.
pub(crate) struct PooledHandle {
    conn: SharedConnection,
    valid: Arc<AtomicBool>,
    type_code: u64,
    created_at: Instant,
    last_used_at: Instant,
    checked_out_at: Option<Instant>,
}

impl PooledHandle {
    pub fn new(conn: SharedConnection) -> Self {
        let now = Instant::now();
        Self {
            conn,
            valid: Arc::new(AtomicBool::new(true)),
            type_code: 0,
            created_at: now,
            last_used_at: now,
            checked_out_at: None,
        }
    }

    /// Issue a fresh handle for the same physical connection, retiring
    /// this one.
    ///
    /// The creation and last-use timestamps carry over; the checkout stamp
    /// and fingerprint do not. The retired handle's wrapper, if a caller
    /// still holds one, fails all further operations.
    pub fn reissue(self) -> Self {
        let reissued = Self {
            conn: Arc::clone(&self.conn),
            valid: Arc::new(AtomicBool::new(true)),
            type_code: 0,
            created_at: self.created_at,
            last_used_at: self.last_used_at,
            checked_out_at: None,
        };
        self.invalidate();
        reissued
    }

    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    pub fn mark_checked_out(&mut self, type_code: u64) {
        let now = Instant::now();
        self.type_code = type_code;
        self.checked_out_at = Some(now);
        self.last_used_at = now;
    }

    /// Time since checkout, or zero for a handle that is not checked out.
    pub fn checkout_time(&self) -> Duration {
        self.checked_out_at.map_or(Duration::ZERO, |t| t.elapsed())
    }

    pub fn idle_time(&self) -> Duration {
        self.last_used_at.elapsed()
    }

    pub fn type_code(&self) -> u64 {
        self.type_code
    }

    pub fn conn(&self) -> &SharedConnection {
        &self.conn
    }

    pub fn connection_id(&self) -> u64 {
        self.conn.connection_id()
    }

    pub fn valid_flag(&self) -> &Arc<AtomicBool> {
        &self.valid
    }

    /// Build the caller-facing wrapper for this handle.
    pub fn wrapper(&self, pool: Arc<PoolInner>) -> PooledConnection {
        PooledConnection {
            pool,
            conn: Arc::clone(&self.conn),
            valid: Arc::clone(&self.valid),
            released: AtomicBool::new(false),
        }
    }
}

/// A connection checked out from a [`Pool`](crate::Pool).
///
/// Forwards the driver-connection surface to the physical connection after
/// a validity check. [`close`](Self::close) returns the connection to the
/// pool instead of closing it; dropping the wrapper without closing does
/// the same. Once the pool retires the underlying handle (return, overdue
/// claim, or `force_close_all`), every forwarded operation fails with
/// [`DriverError::ConnectionInvalid`].
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: SharedConnection,
    valid: Arc<AtomicBool>,
    released: AtomicBool,
}

impl PooledConnection {
    /// Return the connection to the pool.
    ///
    /// Idempotent: a second call (or the eventual drop) is a no-op.
    pub fn close(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.pool.release(&self.conn, &self.valid);
        }
    }

    /// Whether this wrapper is still live.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Stable identity of the underlying physical connection.
    #[must_use]
    pub fn connection_id(&self) -> u64 {
        self.conn.connection_id()
    }

    /// Create a statement on the underlying connection.
    pub fn create_statement(&self) -> Result<Box<dyn Statement + '_>, DriverError> {
        self.check()?;
        self.conn.create_statement()
    }

    /// Commit the current transaction.
    pub fn commit(&self) -> Result<(), DriverError> {
        self.check()?;
        self.conn.commit()
    }

    /// Roll back the current transaction.
    pub fn rollback(&self) -> Result<(), DriverError> {
        self.check()?;
        self.conn.rollback()
    }

    /// Whether the connection is in auto-commit mode.
    pub fn auto_commit(&self) -> Result<bool, DriverError> {
        self.check()?;
        self.conn.auto_commit()
    }

    /// Enable or disable auto-commit mode.
    pub fn set_auto_commit(&self, enabled: bool) -> Result<(), DriverError> {
        self.check()?;
        self.conn.set_auto_commit(enabled)
    }

    /// Whether the underlying physical connection is closed.
    pub fn is_closed(&self) -> Result<bool, DriverError> {
        self.check()?;
        self.conn.is_closed()
    }

    fn check(&self) -> Result<(), DriverError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(DriverError::ConnectionInvalid)
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("connection_id", &self.connection_id())
            .field("valid", &self.is_valid())
            .finish()
    }
}

// Identity follows the physical connection so collections keyed by
// wrappers stay consistent across invalidation.
impl PartialEq for PooledConnection {
    fn eq(&self, other: &Self) -> bool {
        self.connection_id() == other.connection_id()
    }
}

impl Eq for PooledConnection {}

impl Hash for PooledConnection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.connection_id().hash(state);
    }
}
