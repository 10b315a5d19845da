//! # dblink-pool
//!
//! Synchronous, thread-safe connection pool for the dblink connectivity
//! toolkit.
//!
//! The pool hands out [`PooledConnection`] wrappers whose `close` returns
//! the physical connection for reuse instead of closing it. All state
//! lives under a single pool-wide mutex; saturated acquires wait on a
//! condition variable with a bounded timeout. The pool is purely
//! reactive: there are no background threads.
//!
//! ## Features
//!
//! - Idle-connection reuse with FIFO discipline and an idle cap
//! - Bounded growth up to a configurable active cap
//! - Reclamation of connections held past a checkout deadline
//! - Optional liveness probing (configurable query, idle-time gate)
//! - Identity fingerprinting: reconfiguring URL or credentials drains the
//!   pool and drops stale connections on return
//! - Occupancy and lifetime counters under the same lock
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dblink_driver::ProviderConfig;
//! use dblink_pool::Pool;
//!
//! let pool = Pool::builder()
//!     .provider(
//!         ProviderConfig::new("db://localhost:5432/app")
//!             .username("app")
//!             .password("secret"),
//!     )
//!     .max_active(20)
//!     .max_idle(5)
//!     .ping_enabled(true)
//!     .ping_query("SELECT 1")
//!     .build(Arc::new(factory))?;
//!
//! let conn = pool.get()?;
//! let mut stmt = conn.create_statement()?;
//! stmt.execute("DELETE FROM sessions WHERE expired")?;
//! conn.close();
//!
//! println!("{}", pool.metrics());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
mod handle;
mod identity;
mod ping;
mod pool;
mod state;

pub use config::{PoolConfig, DEFAULT_PING_QUERY};
pub use error::PoolError;
pub use handle::PooledConnection;
pub use pool::{Pool, PoolBuilder};
pub use state::{PoolMetrics, PoolStatus};
