//! Mock driver shared by the pool integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dblink_driver::{
    ConnectionFactory, DriverConnection, DriverError, ProviderConfig, Statement,
};
use parking_lot::Mutex;

/// In-memory stand-in for a physical database connection.
pub struct MockConnection {
    id: u64,
    closed: AtomicBool,
    auto_commit: AtomicBool,
    fail_ping: AtomicBool,
    rollbacks: AtomicUsize,
    executed: Mutex<Vec<String>>,
}

impl MockConnection {
    pub fn new(id: u64, auto_commit: bool) -> Self {
        Self {
            id,
            closed: AtomicBool::new(false),
            auto_commit: AtomicBool::new(auto_commit),
            fail_ping: AtomicBool::new(false),
            rollbacks: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Make every subsequent statement execution fail.
    pub fn fail_statements(&self, fail: bool) {
        self.fail_ping.store(fail, Ordering::SeqCst);
    }

    pub fn rollback_count(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl DriverConnection for MockConnection {
    fn connection_id(&self) -> u64 {
        self.id
    }

    fn is_closed(&self) -> Result<bool, DriverError> {
        Ok(self.closed())
    }

    fn auto_commit(&self) -> Result<bool, DriverError> {
        Ok(self.auto_commit.load(Ordering::SeqCst))
    }

    fn set_auto_commit(&self, enabled: bool) -> Result<(), DriverError> {
        self.auto_commit.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn commit(&self) -> Result<(), DriverError> {
        Ok(())
    }

    fn rollback(&self) -> Result<(), DriverError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn create_statement(&self) -> Result<Box<dyn Statement + '_>, DriverError> {
        Ok(Box::new(MockStatement { conn: self }))
    }

    fn close(&self) -> Result<(), DriverError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockStatement<'a> {
    conn: &'a MockConnection,
}

impl Statement for MockStatement<'_> {
    fn execute(&mut self, sql: &str) -> Result<(), DriverError> {
        if self.conn.fail_ping.load(Ordering::SeqCst) {
            return Err(DriverError::Driver("statement failed".to_string()));
        }
        self.conn.executed.lock().push(sql.to_string());
        Ok(())
    }
}

/// Factory producing [`MockConnection`]s with sequential ids.
///
/// Keeps a reference to every connection it opened, so tests can inspect
/// physicals after the pool is done with them.
pub struct MockFactory {
    next_id: AtomicU64,
    opened: Mutex<Vec<Arc<MockConnection>>>,
    fail_new_statements: AtomicBool,
}

impl MockFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            opened: Mutex::new(Vec::new()),
            fail_new_statements: AtomicBool::new(false),
        })
    }

    /// Make every connection opened from now on fail its statements.
    pub fn fail_statements_on_new(&self, fail: bool) {
        self.fail_new_statements.store(fail, Ordering::SeqCst);
    }

    pub fn opened_count(&self) -> usize {
        self.opened.lock().len()
    }

    /// The nth connection this factory opened.
    pub fn connection(&self, index: usize) -> Arc<MockConnection> {
        Arc::clone(&self.opened.lock()[index])
    }
}

impl ConnectionFactory for MockFactory {
    fn open(&self, config: &ProviderConfig) -> Result<Arc<dyn DriverConnection>, DriverError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let conn = Arc::new(MockConnection::new(id, config.auto_commit));
        if self.fail_new_statements.load(Ordering::SeqCst) {
            conn.fail_statements(true);
        }
        self.opened.lock().push(Arc::clone(&conn));
        Ok(conn)
    }
}

pub fn provider() -> ProviderConfig {
    ProviderConfig::new("db://localhost:5432/app")
        .username("app")
        .password("secret")
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(condition: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
