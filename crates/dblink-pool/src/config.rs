//! Pool configuration.

use std::time::Duration;

use crate::error::PoolError;

/// Ping query placeholder used until a real one is configured.
///
/// Executing it fails on any real database, so enabling pinging without
/// setting a query makes every probe fail loudly rather than silently pass.
pub const DEFAULT_PING_QUERY: &str = "NO PING QUERY SET";

/// Configuration for a [`Pool`](crate::Pool).
///
/// Mutating any of these through the pool's setters drains the pool
/// (`force_close_all`). The exceptions are `max_local_bad_connections`
/// and `reuse_on_failed_rollback`, which only affect retry and reclaim
/// bookkeeping and apply immediately.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Cap on concurrently checked-out connections.
    pub max_active: usize,

    /// Cap on retained idle connections.
    pub max_idle: usize,

    /// Checkout duration after which an active connection may be claimed
    /// by another acquirer.
    pub max_checkout_time: Duration,

    /// Upper bound on a single condition-variable wait inside an acquire.
    pub time_to_wait: Duration,

    /// Extra bad-connection retries allowed per acquire beyond `max_idle`.
    pub max_local_bad_connections: usize,

    /// SQL issued to probe connection liveness.
    pub ping_query: String,

    /// Whether the liveness probe may issue `ping_query`.
    pub ping_enabled: bool,

    /// Idle-time gate for the probe: a connection used within this window
    /// is trusted without a probe. `None` disables the gate, so every
    /// enabled probe runs.
    pub ping_min_idle: Option<Duration>,

    /// Whether an overdue connection whose rollback failed is still reused
    /// for the claiming acquirer. When `false` the physical connection is
    /// closed instead and the acquire retries.
    pub reuse_on_failed_rollback: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_active: 10,
            max_idle: 5,
            max_checkout_time: Duration::from_millis(20_000),
            time_to_wait: Duration::from_millis(20_000),
            max_local_bad_connections: 3,
            ping_query: DEFAULT_PING_QUERY.to_string(),
            ping_enabled: false,
            ping_min_idle: None,
            reuse_on_failed_rollback: true,
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the configuration for values the pool cannot run with.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_active == 0 {
            return Err(PoolError::Config(
                "max_active must be at least 1".to_string(),
            ));
        }
        if self.ping_enabled && self.ping_query.is_empty() {
            return Err(PoolError::Config(
                "ping_enabled requires a non-empty ping_query".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the maximum number of active connections.
    #[must_use]
    pub fn max_active(mut self, count: usize) -> Self {
        self.max_active = count;
        self
    }

    /// Set the maximum number of idle connections.
    #[must_use]
    pub fn max_idle(mut self, count: usize) -> Self {
        self.max_idle = count;
        self
    }

    /// Set the checkout duration after which a connection may be claimed.
    #[must_use]
    pub fn max_checkout_time(mut self, duration: Duration) -> Self {
        self.max_checkout_time = duration;
        self
    }

    /// Set the per-wait bound for acquires.
    #[must_use]
    pub fn time_to_wait(mut self, duration: Duration) -> Self {
        self.time_to_wait = duration;
        self
    }

    /// Set the extra bad-connection retries allowed per acquire.
    #[must_use]
    pub fn max_local_bad_connections(mut self, count: usize) -> Self {
        self.max_local_bad_connections = count;
        self
    }

    /// Set the liveness probe query.
    #[must_use]
    pub fn ping_query(mut self, query: impl Into<String>) -> Self {
        self.ping_query = query.into();
        self
    }

    /// Enable or disable the liveness probe query.
    #[must_use]
    pub fn ping_enabled(mut self, enabled: bool) -> Self {
        self.ping_enabled = enabled;
        self
    }

    /// Set the idle-time gate for the probe.
    #[must_use]
    pub fn ping_min_idle(mut self, window: Option<Duration>) -> Self {
        self.ping_min_idle = window;
        self
    }

    /// Set whether overdue connections are reused after a failed rollback.
    #[must_use]
    pub fn reuse_on_failed_rollback(mut self, reuse: bool) -> Self {
        self.reuse_on_failed_rollback = reuse;
        self
    }
}
