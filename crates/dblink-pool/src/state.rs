//! Pool state container and diagnostic snapshots.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use crate::handle::PooledHandle;

/// Mutable pool bookkeeping, guarded by the pool-wide mutex.
///
/// `idle` and `active` are FIFO: checkouts take from the front, returns
/// push to the back, so `active.front()` is always the oldest checkout.
#[derive(Default)]
pub(crate) struct PoolState {
    pub idle: VecDeque<PooledHandle>,
    pub active: VecDeque<PooledHandle>,

    pub request_count: u64,
    pub had_to_wait_count: u64,
    pub bad_connection_count: u64,
    pub claimed_overdue_connection_count: u64,
    pub accumulated_request_time: Duration,
    pub accumulated_wait_time: Duration,
    pub accumulated_checkout_time: Duration,
    pub accumulated_overdue_checkout_time: Duration,
}

impl PoolState {
    pub fn status_snapshot(&self, max_active: usize, max_idle: usize) -> PoolStatus {
        PoolStatus {
            idle: self.idle.len(),
            active: self.active.len(),
            max_active,
            max_idle,
        }
    }

    pub fn metrics_snapshot(&self) -> PoolMetrics {
        PoolMetrics {
            request_count: self.request_count,
            had_to_wait_count: self.had_to_wait_count,
            bad_connection_count: self.bad_connection_count,
            claimed_overdue_connection_count: self.claimed_overdue_connection_count,
            accumulated_request_time: self.accumulated_request_time,
            accumulated_wait_time: self.accumulated_wait_time,
            accumulated_checkout_time: self.accumulated_checkout_time,
            accumulated_overdue_checkout_time: self.accumulated_overdue_checkout_time,
        }
    }
}

/// Point-in-time view of the pool's occupancy.
#[derive(Debug, Clone, Copy)]
pub struct PoolStatus {
    /// Number of idle connections retained by the pool.
    pub idle: usize,
    /// Number of connections currently checked out.
    pub active: usize,
    /// Configured cap on active connections.
    pub max_active: usize,
    /// Configured cap on idle connections.
    pub max_idle: usize,
}

impl PoolStatus {
    /// Active connections as a percentage of the configured cap.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max_active == 0 {
            return 0.0;
        }
        (self.active as f64 / self.max_active as f64) * 100.0
    }

    /// Whether the pool cannot open another connection.
    #[must_use]
    pub fn is_at_capacity(&self) -> bool {
        self.active >= self.max_active
    }
}

/// Counters accumulated over the pool's lifetime.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Successful acquires.
    pub request_count: u64,
    /// Acquires that had to wait at least once.
    pub had_to_wait_count: u64,
    /// Candidates that failed validation, plus invalid returns.
    pub bad_connection_count: u64,
    /// Overdue active connections claimed by other acquirers.
    pub claimed_overdue_connection_count: u64,
    /// Total wall time spent inside successful acquires.
    pub accumulated_request_time: Duration,
    /// Total wall time spent blocked on the condition variable.
    pub accumulated_wait_time: Duration,
    /// Total checkout duration across returned and claimed connections.
    pub accumulated_checkout_time: Duration,
    /// Checkout duration attributable to claimed overdue connections.
    pub accumulated_overdue_checkout_time: Duration,
}

impl PoolMetrics {
    /// Mean wall time per successful acquire.
    #[must_use]
    pub fn avg_request_time(&self) -> Duration {
        avg(self.accumulated_request_time, self.request_count)
    }

    /// Mean wall time blocked per waiting acquire.
    #[must_use]
    pub fn avg_wait_time(&self) -> Duration {
        avg(self.accumulated_wait_time, self.had_to_wait_count)
    }

    /// Mean checkout duration per successful acquire.
    #[must_use]
    pub fn avg_checkout_time(&self) -> Duration {
        avg(self.accumulated_checkout_time, self.request_count)
    }

    /// Mean checkout duration per claimed overdue connection.
    #[must_use]
    pub fn avg_overdue_checkout_time(&self) -> Duration {
        avg(
            self.accumulated_overdue_checkout_time,
            self.claimed_overdue_connection_count,
        )
    }
}

impl fmt::Display for PoolMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requests: {} (avg {:?}), waits: {} (avg {:?}), bad: {}, \
             claimed overdue: {} (avg checkout {:?}), avg checkout: {:?}",
            self.request_count,
            self.avg_request_time(),
            self.had_to_wait_count,
            self.avg_wait_time(),
            self.bad_connection_count,
            self.claimed_overdue_connection_count,
            self.avg_overdue_checkout_time(),
            self.avg_checkout_time(),
        )
    }
}

fn avg(total: Duration, count: u64) -> Duration {
    if count == 0 {
        Duration::ZERO
    } else {
        total / count.min(u64::from(u32::MAX)) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_utilization() {
        let status = PoolStatus {
            idle: 5,
            active: 5,
            max_active: 20,
            max_idle: 5,
        };
        assert!((status.utilization() - 25.0).abs() < f64::EPSILON);
        assert!(!status.is_at_capacity());
    }

    #[test]
    fn test_status_at_capacity() {
        let status = PoolStatus {
            idle: 0,
            active: 10,
            max_active: 10,
            max_idle: 5,
        };
        assert!(status.is_at_capacity());
    }

    #[test]
    fn test_metrics_averages() {
        let metrics = PoolMetrics {
            request_count: 4,
            had_to_wait_count: 2,
            bad_connection_count: 0,
            claimed_overdue_connection_count: 0,
            accumulated_request_time: Duration::from_millis(100),
            accumulated_wait_time: Duration::from_millis(30),
            accumulated_checkout_time: Duration::from_millis(400),
            accumulated_overdue_checkout_time: Duration::ZERO,
        };

        assert_eq!(metrics.avg_request_time(), Duration::from_millis(25));
        assert_eq!(metrics.avg_wait_time(), Duration::from_millis(15));
        assert_eq!(metrics.avg_checkout_time(), Duration::from_millis(100));
        assert_eq!(metrics.avg_overdue_checkout_time(), Duration::ZERO);
    }

    #[test]
    fn test_metrics_display_mentions_counters() {
        let metrics = PoolMetrics {
            request_count: 7,
            had_to_wait_count: 1,
            bad_connection_count: 2,
            claimed_overdue_connection_count: 3,
            accumulated_request_time: Duration::ZERO,
            accumulated_wait_time: Duration::ZERO,
            accumulated_checkout_time: Duration::ZERO,
            accumulated_overdue_checkout_time: Duration::ZERO,
        };
        let rendered = metrics.to_string();
        assert!(rendered.contains("requests: 7"));
        assert!(rendered.contains("claimed overdue: 3"));
    }
}
