//! Connection pool implementation.
//!
//! One mutex guards configuration, provider settings, and all pool state;
//! there are no nested locks. Acquires that find the pool saturated wait
//! on a condition variable and re-run the full decision tree on every
//! wake, so the wake source never needs to be discriminated.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dblink_driver::{
    ConnectionFactory, DriverError, IsolationLevel, ProviderConfig, SharedConnection,
};
use parking_lot::{Condvar, Mutex};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::handle::{PooledConnection, PooledHandle};
use crate::identity::connection_type_code;
use crate::ping::ping_connection;
use crate::state::{PoolMetrics, PoolState, PoolStatus};

/// A synchronous, thread-safe connection pool.
///
/// The pool is purely reactive: connections are opened, validated,
/// claimed, and closed on caller threads only. Cloning the pool is cheap
/// and yields another handle to the same shared state.
///
/// # Example
///
/// ```rust,ignore
/// use dblink_pool::{Pool, PoolConfig};
/// use dblink_driver::ProviderConfig;
///
/// let pool = Pool::builder()
///     .provider(ProviderConfig::new("db://localhost/app").username("app"))
///     .max_active(20)
///     .ping_enabled(true)
///     .ping_query("SELECT 1")
///     .build(factory)?;
///
/// let conn = pool.get()?;
/// let mut stmt = conn.create_statement()?;
/// stmt.execute("SELECT * FROM users")?;
/// conn.close();
/// ```
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

pub(crate) struct PoolInner {
    factory: Arc<dyn ConnectionFactory>,
    guts: Mutex<PoolGuts>,
    available: Condvar,
    closed: AtomicBool,
}

/// Everything behind the pool-wide mutex.
struct PoolGuts {
    config: PoolConfig,
    provider: ProviderConfig,
    expected_type_code: u64,
    state: PoolState,
}

impl Pool {
    /// Create a new pool builder.
    #[must_use]
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Create a new pool from a factory and explicit configuration.
    pub fn new(
        factory: Arc<dyn ConnectionFactory>,
        provider: ProviderConfig,
        config: PoolConfig,
    ) -> Result<Self, PoolError> {
        config.validate()?;

        let expected_type_code =
            connection_type_code(&provider.url, &provider.username, &provider.password);

        tracing::info!(
            max_active = config.max_active,
            max_idle = config.max_idle,
            url = %provider.url,
            "connection pool created"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                factory,
                guts: Mutex::new(PoolGuts {
                    config,
                    provider,
                    expected_type_code,
                    state: PoolState::default(),
                }),
                available: Condvar::new(),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Get a connection from the pool.
    ///
    /// Takes an idle connection if one exists, opens a new one while under
    /// the active cap, claims the oldest overdue active connection, or
    /// waits for a return. Fails with [`PoolError::NoGoodConnection`] once
    /// the bad-candidate retry budget is spent, or immediately with the
    /// driver's error if opening a fresh connection fails.
    pub fn get(&self) -> Result<PooledConnection, PoolError> {
        self.acquire(None, None)
    }

    /// Get a connection, fingerprinted with the given credentials.
    ///
    /// The credentials participate in the connection's identity
    /// fingerprint; authentication itself stays with the factory.
    pub fn get_as(&self, username: &str, password: &str) -> Result<PooledConnection, PoolError> {
        self.acquire(Some(username), Some(password))
    }

    fn acquire(
        &self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<PooledConnection, PoolError> {
        let started = Instant::now();
        let mut counted_wait = false;
        let mut local_bad_count = 0usize;
        let inner = &self.inner;
        let mut guts = inner.guts.lock();

        loop {
            if inner.closed.load(Ordering::Acquire) {
                return Err(PoolError::PoolClosed);
            }

            let mut candidate = if let Some(handle) = guts.state.idle.pop_front() {
                tracing::debug!(
                    conn_id = handle.connection_id(),
                    "checked out connection from pool"
                );
                handle
            } else if guts.state.active.len() < guts.config.max_active {
                let conn = inner.factory.open(&guts.provider)?;
                tracing::debug!(conn_id = conn.connection_id(), "created connection");
                PooledHandle::new(conn)
            } else {
                let longest_checkout = guts
                    .state
                    .active
                    .front()
                    .map_or(Duration::ZERO, PooledHandle::checkout_time);

                if longest_checkout > guts.config.max_checkout_time {
                    match claim_overdue(&mut guts, longest_checkout) {
                        Some(handle) => handle,
                        None => {
                            guts.state.bad_connection_count += 1;
                            local_bad_count += 1;
                            if local_bad_count
                                > guts.config.max_idle + guts.config.max_local_bad_connections
                            {
                                tracing::debug!(
                                    "could not get a good connection to the database"
                                );
                                return Err(PoolError::NoGoodConnection);
                            }
                            continue;
                        }
                    }
                } else {
                    if !counted_wait {
                        guts.state.had_to_wait_count += 1;
                        counted_wait = true;
                    }
                    let timeout = guts.config.time_to_wait;
                    tracing::debug!(
                        timeout_ms = timeout.as_millis() as u64,
                        "waiting for a returned connection"
                    );
                    let wait_started = Instant::now();
                    inner.available.wait_for(&mut guts, timeout);
                    guts.state.accumulated_wait_time += wait_started.elapsed();
                    continue;
                }
            };

            if ping_connection(&guts.config, &candidate) {
                if !candidate.conn().auto_commit()? {
                    candidate.conn().rollback()?;
                }

                let type_code = connection_type_code(
                    &guts.provider.url,
                    username.unwrap_or(&guts.provider.username),
                    password.unwrap_or(&guts.provider.password),
                );
                candidate.mark_checked_out(type_code);

                let wrapper = candidate.wrapper(Arc::clone(inner));
                guts.state.active.push_back(candidate);
                guts.state.request_count += 1;
                guts.state.accumulated_request_time += started.elapsed();
                return Ok(wrapper);
            }

            tracing::debug!(
                conn_id = candidate.connection_id(),
                "a bad connection was returned from the pool, getting another"
            );
            candidate.invalidate();
            guts.state.bad_connection_count += 1;
            local_bad_count += 1;
            if local_bad_count > guts.config.max_idle + guts.config.max_local_bad_connections {
                tracing::debug!("could not get a good connection to the database");
                return Err(PoolError::NoGoodConnection);
            }
        }
    }

    /// Invalidate and close every pooled connection.
    ///
    /// Also recomputes the expected identity fingerprint, so connections
    /// checked out before the call are dropped rather than recycled when
    /// they come back. Invoked by every configuration setter that affects
    /// connection identity or pool shape.
    pub fn force_close_all(&self) {
        let mut guts = self.inner.guts.lock();
        force_close_all_locked(&mut guts);
    }

    /// Shut the pool down.
    ///
    /// Closes every pooled connection, wakes all waiters, and makes every
    /// subsequent or in-flight acquire fail with [`PoolError::PoolClosed`].
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Release);
        {
            let mut guts = self.inner.guts.lock();
            force_close_all_locked(&mut guts);
        }
        self.inner.available.notify_all();
        tracing::info!("connection pool shut down");
    }

    /// Whether the pool has been shut down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Get the current pool occupancy.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let guts = self.inner.guts.lock();
        guts.state
            .status_snapshot(guts.config.max_active, guts.config.max_idle)
    }

    /// Get the pool's lifetime counters.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        self.inner.guts.lock().state.metrics_snapshot()
    }

    /// Snapshot of the current pool configuration.
    #[must_use]
    pub fn config(&self) -> PoolConfig {
        self.inner.guts.lock().config.clone()
    }

    /// Snapshot of the current provider configuration.
    #[must_use]
    pub fn provider_config(&self) -> ProviderConfig {
        self.inner.guts.lock().provider.clone()
    }

    /// Set the database URL. Drains the pool.
    pub fn set_url(&self, url: impl Into<String>) {
        let mut guts = self.inner.guts.lock();
        guts.provider.url = url.into();
        force_close_all_locked(&mut guts);
    }

    /// Set the username. Drains the pool.
    pub fn set_username(&self, username: impl Into<String>) {
        let mut guts = self.inner.guts.lock();
        guts.provider.username = username.into();
        force_close_all_locked(&mut guts);
    }

    /// Set the password. Drains the pool.
    pub fn set_password(&self, password: impl Into<String>) {
        let mut guts = self.inner.guts.lock();
        guts.provider.password = password.into();
        force_close_all_locked(&mut guts);
    }

    /// Set the default auto-commit mode for fresh connections. Drains the
    /// pool.
    pub fn set_default_auto_commit(&self, enabled: bool) {
        let mut guts = self.inner.guts.lock();
        guts.provider.auto_commit = enabled;
        force_close_all_locked(&mut guts);
    }

    /// Set the default isolation level for fresh connections. Drains the
    /// pool.
    pub fn set_default_isolation(&self, level: Option<IsolationLevel>) {
        let mut guts = self.inner.guts.lock();
        guts.provider.isolation = level;
        force_close_all_locked(&mut guts);
    }

    /// Replace the driver properties. Drains the pool.
    pub fn set_driver_properties(&self, properties: HashMap<String, String>) {
        let mut guts = self.inner.guts.lock();
        guts.provider.properties = properties;
        force_close_all_locked(&mut guts);
    }

    /// Set the cap on active connections. Drains the pool.
    pub fn set_max_active(&self, count: usize) {
        let mut guts = self.inner.guts.lock();
        guts.config.max_active = count;
        force_close_all_locked(&mut guts);
    }

    /// Set the cap on idle connections. Drains the pool.
    pub fn set_max_idle(&self, count: usize) {
        let mut guts = self.inner.guts.lock();
        guts.config.max_idle = count;
        force_close_all_locked(&mut guts);
    }

    /// Set the overdue-checkout threshold. Drains the pool.
    pub fn set_max_checkout_time(&self, duration: Duration) {
        let mut guts = self.inner.guts.lock();
        guts.config.max_checkout_time = duration;
        force_close_all_locked(&mut guts);
    }

    /// Set the per-wait bound for acquires. Drains the pool.
    pub fn set_time_to_wait(&self, duration: Duration) {
        let mut guts = self.inner.guts.lock();
        guts.config.time_to_wait = duration;
        force_close_all_locked(&mut guts);
    }

    /// Set the liveness probe query. Drains the pool.
    pub fn set_ping_query(&self, query: impl Into<String>) {
        let mut guts = self.inner.guts.lock();
        guts.config.ping_query = query.into();
        force_close_all_locked(&mut guts);
    }

    /// Enable or disable the liveness probe query. Drains the pool.
    pub fn set_ping_enabled(&self, enabled: bool) {
        let mut guts = self.inner.guts.lock();
        guts.config.ping_enabled = enabled;
        force_close_all_locked(&mut guts);
    }

    /// Set the idle-time gate for the probe. Drains the pool.
    pub fn set_ping_min_idle(&self, window: Option<Duration>) {
        let mut guts = self.inner.guts.lock();
        guts.config.ping_min_idle = window;
        force_close_all_locked(&mut guts);
    }

    /// Set the extra bad-connection retries allowed per acquire.
    ///
    /// Applied immediately; affects only retry bookkeeping, so the pool is
    /// not drained.
    pub fn set_max_local_bad_connections(&self, count: usize) {
        self.inner.guts.lock().config.max_local_bad_connections = count;
    }

    /// Set whether overdue connections are reused after a failed rollback.
    ///
    /// Applied immediately; affects only the reclaim path, so the pool is
    /// not drained.
    pub fn set_reuse_on_failed_rollback(&self, reuse: bool) {
        self.inner.guts.lock().config.reuse_on_failed_rollback = reuse;
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status();
        f.debug_struct("Pool")
            .field("idle", &status.idle)
            .field("active", &status.active)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl PoolInner {
    /// Return a checked-out connection to the pool.
    ///
    /// Never fails from the caller's point of view: cleanup errors are
    /// logged and swallowed. A connection that comes back invalid, or with
    /// a stale identity fingerprint, or past the idle cap, is closed
    /// instead of recycled.
    pub(crate) fn release(&self, conn: &SharedConnection, valid: &Arc<AtomicBool>) {
        let mut guts = self.guts.lock();

        let position = guts
            .state
            .active
            .iter()
            .position(|h| Arc::ptr_eq(h.valid_flag(), valid));
        let handle = position.and_then(|i| guts.state.active.remove(i));

        let Some(handle) = handle.filter(PooledHandle::is_valid) else {
            tracing::debug!(
                conn_id = conn.connection_id(),
                "a bad connection attempted to return to the pool, discarding"
            );
            guts.state.bad_connection_count += 1;
            return;
        };

        guts.state.accumulated_checkout_time += handle.checkout_time();

        if guts.state.idle.len() < guts.config.max_idle
            && handle.type_code() == guts.expected_type_code
        {
            match rollback_if_needed(&handle) {
                Ok(()) => {
                    let recycled = handle.reissue();
                    tracing::debug!(
                        conn_id = recycled.connection_id(),
                        "returned connection to pool"
                    );
                    guts.state.idle.push_back(recycled);
                    self.available.notify_all();
                }
                Err(e) => {
                    // Transaction state is unknown after a failed rollback;
                    // the connection is not recycled.
                    tracing::debug!(
                        conn_id = handle.connection_id(),
                        error = %e,
                        "could not roll back returned connection, closing it"
                    );
                    handle.invalidate();
                    let _ = handle.conn().close();
                }
            }
        } else {
            if let Err(e) = rollback_if_needed(&handle) {
                tracing::debug!(
                    conn_id = handle.connection_id(),
                    error = %e,
                    "could not roll back returned connection"
                );
            }
            handle.invalidate();
            let _ = handle.conn().close();
            tracing::debug!(conn_id = handle.connection_id(), "closed connection");
        }
    }
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        // Escape hatch for a leaked pool; `shutdown` is the real cleanup.
        let guts = self.guts.get_mut();
        while let Some(handle) = guts.state.active.pop_back() {
            close_physical(&handle);
        }
        while let Some(handle) = guts.state.idle.pop_back() {
            close_physical(&handle);
        }
    }
}

/// Claim the oldest active connection, whose checkout exceeded the cap.
///
/// Returns `None` when the rollback failed and reuse after failed rollback
/// is disabled; the physical connection is closed in that case.
fn claim_overdue(guts: &mut PoolGuts, longest_checkout: Duration) -> Option<PooledHandle> {
    let oldest = guts.state.active.pop_front()?;
    guts.state.claimed_overdue_connection_count += 1;
    guts.state.accumulated_overdue_checkout_time += longest_checkout;
    guts.state.accumulated_checkout_time += longest_checkout;

    let rolled_back = match rollback_if_needed(&oldest) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(
                conn_id = oldest.connection_id(),
                error = %e,
                "bad connection, could not roll back"
            );
            false
        }
    };

    if !rolled_back && !guts.config.reuse_on_failed_rollback {
        oldest.invalidate();
        let _ = oldest.conn().close();
        return None;
    }

    let claimed = oldest.reissue();
    tracing::debug!(conn_id = claimed.connection_id(), "claimed overdue connection");
    Some(claimed)
}

fn force_close_all_locked(guts: &mut PoolGuts) {
    guts.expected_type_code = connection_type_code(
        &guts.provider.url,
        &guts.provider.username,
        &guts.provider.password,
    );
    while let Some(handle) = guts.state.active.pop_back() {
        close_physical(&handle);
    }
    while let Some(handle) = guts.state.idle.pop_back() {
        close_physical(&handle);
    }
    tracing::debug!("forcefully closed all pooled connections");
}

fn close_physical(handle: &PooledHandle) {
    handle.invalidate();
    let _ = rollback_if_needed(handle);
    let _ = handle.conn().close();
}

fn rollback_if_needed(handle: &PooledHandle) -> Result<(), DriverError> {
    if !handle.conn().auto_commit()? {
        handle.conn().rollback()?;
    }
    Ok(())
}

/// Builder for creating a connection pool.
///
/// # Example
///
/// ```rust,ignore
/// let pool = Pool::builder()
///     .provider(provider_config)
///     .max_active(20)
///     .time_to_wait(Duration::from_secs(5))
///     .build(factory)?;
/// ```
pub struct PoolBuilder {
    provider: ProviderConfig,
    config: PoolConfig,
}

impl PoolBuilder {
    /// Create a new pool builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            provider: ProviderConfig::default(),
            config: PoolConfig::default(),
        }
    }

    /// Set the provider configuration.
    #[must_use]
    pub fn provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }

    /// Set the full pool configuration.
    #[must_use]
    pub fn pool_config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the cap on active connections.
    #[must_use]
    pub fn max_active(mut self, count: usize) -> Self {
        self.config.max_active = count;
        self
    }

    /// Set the cap on idle connections.
    #[must_use]
    pub fn max_idle(mut self, count: usize) -> Self {
        self.config.max_idle = count;
        self
    }

    /// Set the overdue-checkout threshold.
    #[must_use]
    pub fn max_checkout_time(mut self, duration: Duration) -> Self {
        self.config.max_checkout_time = duration;
        self
    }

    /// Set the per-wait bound for acquires.
    #[must_use]
    pub fn time_to_wait(mut self, duration: Duration) -> Self {
        self.config.time_to_wait = duration;
        self
    }

    /// Set the extra bad-connection retries allowed per acquire.
    #[must_use]
    pub fn max_local_bad_connections(mut self, count: usize) -> Self {
        self.config.max_local_bad_connections = count;
        self
    }

    /// Set the liveness probe query.
    #[must_use]
    pub fn ping_query(mut self, query: impl Into<String>) -> Self {
        self.config.ping_query = query.into();
        self
    }

    /// Enable or disable the liveness probe query.
    #[must_use]
    pub fn ping_enabled(mut self, enabled: bool) -> Self {
        self.config.ping_enabled = enabled;
        self
    }

    /// Set the idle-time gate for the probe.
    #[must_use]
    pub fn ping_min_idle(mut self, window: Option<Duration>) -> Self {
        self.config.ping_min_idle = window;
        self
    }

    /// Set whether overdue connections are reused after a failed rollback.
    #[must_use]
    pub fn reuse_on_failed_rollback(mut self, reuse: bool) -> Self {
        self.config.reuse_on_failed_rollback = reuse;
        self
    }

    /// Build the pool.
    pub fn build(self, factory: Arc<dyn ConnectionFactory>) -> Result<Pool, PoolError> {
        Pool::new(factory, self.provider, self.config)
    }
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
