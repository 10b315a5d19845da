//! Single-threaded pool lifecycle tests: checkout, recycling, caps,
//! fingerprinting, and liveness probing against a mock driver.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::time::Duration;

use dblink_driver::DriverError;
use dblink_pool::{Pool, PoolError};

use common::{provider, MockFactory};

#[test]
fn test_checkout_and_return_recycles_physical() {
    let factory = MockFactory::new();
    let pool = Pool::builder()
        .provider(provider())
        .max_active(2)
        .max_idle(2)
        .build(factory.clone())
        .unwrap();

    let conn = pool.get().unwrap();
    let first_id = conn.connection_id();
    assert_eq!(pool.status().active, 1);
    assert_eq!(pool.status().idle, 0);

    conn.close();
    assert!(!conn.is_valid());
    assert_eq!(pool.status().active, 0);
    assert_eq!(pool.status().idle, 1);

    let again = pool.get().unwrap();
    assert_eq!(again.connection_id(), first_id);
    assert_eq!(factory.opened_count(), 1);
    assert_eq!(pool.status().active, 1);
    assert_eq!(pool.status().idle, 0);
}

#[test]
fn test_close_is_idempotent() {
    let factory = MockFactory::new();
    let pool = Pool::builder()
        .provider(provider())
        .build(factory)
        .unwrap();

    let conn = pool.get().unwrap();
    conn.close();
    conn.close();

    assert_eq!(pool.status().idle, 1);
    assert_eq!(pool.metrics().bad_connection_count, 0);
}

#[test]
fn test_drop_returns_connection() {
    let factory = MockFactory::new();
    let pool = Pool::builder()
        .provider(provider())
        .build(factory)
        .unwrap();

    {
        let _conn = pool.get().unwrap();
        assert_eq!(pool.status().active, 1);
    }
    assert_eq!(pool.status().active, 0);
    assert_eq!(pool.status().idle, 1);
}

#[test]
fn test_invalidated_wrapper_fails_forwarded_operations() {
    let factory = MockFactory::new();
    let pool = Pool::builder()
        .provider(provider())
        .build(factory)
        .unwrap();

    let conn = pool.get().unwrap();
    conn.close();

    assert!(matches!(
        conn.rollback(),
        Err(DriverError::ConnectionInvalid)
    ));
    assert!(matches!(
        conn.create_statement().err(),
        Some(DriverError::ConnectionInvalid)
    ));
    // Identity stays readable on an invalid wrapper.
    assert!(conn.connection_id() > 0);
}

#[test]
fn test_growth_stops_at_max_active() {
    let factory = MockFactory::new();
    let pool = Pool::builder()
        .provider(provider())
        .max_active(3)
        .build(factory.clone())
        .unwrap();

    let a = pool.get().unwrap();
    let b = pool.get().unwrap();
    let c = pool.get().unwrap();

    // Three distinct physicals, one wrapper each.
    assert_ne!(a.connection_id(), b.connection_id());
    assert_ne!(b.connection_id(), c.connection_id());
    assert_ne!(a.connection_id(), c.connection_id());
    assert_eq!(factory.opened_count(), 3);

    let status = pool.status();
    assert_eq!(status.active, 3);
    assert!(status.is_at_capacity());
}

#[test]
fn test_idle_cap_closes_surplus_returns() {
    let factory = MockFactory::new();
    let pool = Pool::builder()
        .provider(provider())
        .max_active(3)
        .max_idle(2)
        .build(factory.clone())
        .unwrap();

    let a = pool.get().unwrap();
    let b = pool.get().unwrap();
    let c = pool.get().unwrap();
    a.close();
    b.close();
    c.close();

    assert_eq!(pool.status().idle, 2);
    let closed = (0..3).filter(|&i| factory.connection(i).closed()).count();
    assert_eq!(closed, 1);
}

#[test]
fn test_stale_fingerprint_is_dropped_on_return() {
    let factory = MockFactory::new();
    let pool = Pool::builder()
        .provider(provider())
        .build(factory.clone())
        .unwrap();

    // Credentials differing from the provider's give the checkout a
    // fingerprint the pool does not expect back.
    let conn = pool.get_as("reporting", "other").unwrap();
    conn.close();

    assert_eq!(pool.status().idle, 0);
    assert!(factory.connection(0).closed());
    assert_eq!(pool.metrics().bad_connection_count, 0);
}

#[test]
fn test_reconfiguration_force_closes_everything() {
    let factory = MockFactory::new();
    let pool = Pool::builder()
        .provider(provider())
        .max_active(5)
        .max_idle(5)
        .build(factory.clone())
        .unwrap();

    let held: Vec<_> = (0..5).map(|_| pool.get().unwrap()).collect();
    held[2].close();
    held[3].close();
    held[4].close();
    assert_eq!(pool.status().active, 2);
    assert_eq!(pool.status().idle, 3);

    pool.set_url("db://replica:5432/app");

    assert_eq!(pool.status().active, 0);
    assert_eq!(pool.status().idle, 0);
    for i in 0..5 {
        assert!(factory.connection(i).closed());
    }

    // The two wrappers checked out across the reconfiguration are dead.
    assert!(!held[0].is_valid());
    assert!(matches!(
        held[0].rollback(),
        Err(DriverError::ConnectionInvalid)
    ));
    held[0].close();
    held[1].close();
    assert_eq!(pool.status().idle, 0);
    assert_eq!(pool.metrics().bad_connection_count, 2);
}

#[test]
fn test_ping_skipped_for_recently_used() {
    let factory = MockFactory::new();
    let pool = Pool::builder()
        .provider(provider())
        .ping_enabled(true)
        .ping_query("SELECT 1")
        .ping_min_idle(Some(Duration::from_secs(1)))
        .build(factory.clone())
        .unwrap();

    let conn = pool.get().unwrap();
    conn.close();
    let conn = pool.get().unwrap();
    conn.close();

    assert!(factory.connection(0).executed().is_empty());
}

#[test]
fn test_ping_issued_for_stale_connection() {
    let factory = MockFactory::new();
    let pool = Pool::builder()
        .provider(provider())
        .ping_enabled(true)
        .ping_query("SELECT 1")
        .ping_min_idle(Some(Duration::ZERO))
        .build(factory.clone())
        .unwrap();

    let conn = pool.get().unwrap();
    conn.close();
    let probes_before = factory.connection(0).executed().len();
    std::thread::sleep(Duration::from_millis(5));

    let conn = pool.get().unwrap();
    conn.close();

    let executed = factory.connection(0).executed();
    assert_eq!(executed.len(), probes_before + 1);
    assert_eq!(executed.last().map(String::as_str), Some("SELECT 1"));
}

#[test]
fn test_failed_ping_drops_connection_and_retries() {
    let factory = MockFactory::new();
    let pool = Pool::builder()
        .provider(provider())
        .ping_enabled(true)
        .ping_query("SELECT 1")
        .ping_min_idle(Some(Duration::ZERO))
        .build(factory.clone())
        .unwrap();

    let conn = pool.get().unwrap();
    let first_id = conn.connection_id();
    conn.close();

    factory.connection(0).fail_statements(true);
    std::thread::sleep(Duration::from_millis(5));

    let conn = pool.get().unwrap();
    assert_ne!(conn.connection_id(), first_id);
    assert!(factory.connection(0).closed());
    assert_eq!(factory.opened_count(), 2);
    assert_eq!(pool.metrics().bad_connection_count, 1);
}

#[test]
fn test_exhausted_retry_budget_fails_acquire() {
    let factory = MockFactory::new();
    factory.fail_statements_on_new(true);

    let pool = Pool::builder()
        .provider(provider())
        .max_idle(1)
        .max_local_bad_connections(1)
        .ping_enabled(true)
        .ping_query("SELECT 1")
        .ping_min_idle(None)
        .build(factory.clone())
        .unwrap();

    let result = pool.get();
    assert!(matches!(result, Err(PoolError::NoGoodConnection)));

    // max_idle + max_local_bad_connections + 1 candidates were burned.
    assert_eq!(factory.opened_count(), 3);
    assert_eq!(pool.metrics().bad_connection_count, 3);
    assert_eq!(pool.metrics().request_count, 0);
}

#[test]
fn test_transactional_connection_rolls_back_on_checkout_and_return() {
    let factory = MockFactory::new();
    let pool = Pool::builder()
        .provider(provider().auto_commit(false))
        .build(factory.clone())
        .unwrap();

    let conn = pool.get().unwrap();
    assert_eq!(factory.connection(0).rollback_count(), 1);

    conn.close();
    assert_eq!(factory.connection(0).rollback_count(), 2);
    assert_eq!(pool.status().idle, 1);
}

#[test]
fn test_request_metrics_accumulate() {
    let factory = MockFactory::new();
    let pool = Pool::builder()
        .provider(provider())
        .build(factory)
        .unwrap();

    for _ in 0..4 {
        pool.get().unwrap().close();
    }

    let metrics = pool.metrics();
    assert_eq!(metrics.request_count, 4);
    assert_eq!(metrics.had_to_wait_count, 0);
    assert_eq!(metrics.bad_connection_count, 0);
    let rendered = metrics.to_string();
    assert!(rendered.contains("requests: 4"));
}
