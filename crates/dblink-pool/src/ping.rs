//! Connection liveness probe.
//!
//! Decides whether a candidate connection is usable right now. The probe
//! only reports; the acquire loop decides what to do with a bad candidate.

use dblink_driver::DriverError;

use crate::config::PoolConfig;
use crate::handle::PooledHandle;

/// Check whether a candidate's physical connection is usable.
///
/// A closed connection is always bad. Beyond that, a probe query runs only
/// when enabled and the candidate has been idle longer than the configured
/// gate window. A failed probe closes the physical connection best-effort.
pub(crate) fn ping_connection(config: &PoolConfig, handle: &PooledHandle) -> bool {
    let conn = handle.conn();
    let conn_id = handle.connection_id();

    match conn.is_closed() {
        Ok(false) => {}
        Ok(true) => return false,
        Err(e) => {
            tracing::debug!(conn_id, error = %e, "connection is bad");
            return false;
        }
    }

    if !config.ping_enabled {
        return true;
    }

    if let Some(min_idle) = config.ping_min_idle {
        if handle.idle_time() <= min_idle {
            return true;
        }
    }

    tracing::debug!(conn_id, "testing connection");
    let probe = (|| -> Result<(), DriverError> {
        {
            let mut stmt = conn.create_statement()?;
            stmt.execute(&config.ping_query)?;
        }
        if !conn.auto_commit()? {
            conn.rollback()?;
        }
        Ok(())
    })();

    match probe {
        Ok(()) => {
            tracing::debug!(conn_id, "connection is good");
            true
        }
        Err(e) => {
            tracing::warn!(
                conn_id,
                query = %config.ping_query,
                error = %e,
                "execution of ping query failed"
            );
            let _ = conn.close();
            false
        }
    }
}
