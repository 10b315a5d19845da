//! # dblink-driver
//!
//! Driver capability surface for the dblink connectivity toolkit.
//!
//! This crate defines the contract between a database driver and the layers
//! built on top of it (most importantly the connection pool in
//! `dblink-pool`). A driver supplies two things:
//!
//! - an implementation of [`DriverConnection`], the capability set a live
//!   database connection must expose (transaction control, statement
//!   creation, lifecycle queries, a stable identity), and
//! - an implementation of [`ConnectionFactory`], which opens fresh
//!   connections from a [`ProviderConfig`] (URL, credentials, session
//!   defaults, driver properties).
//!
//! ## Example
//!
//! ```rust,ignore
//! use dblink_driver::{ConnectionFactory, ProviderConfig};
//!
//! let provider = ProviderConfig::from_connection_string(
//!     "url=db://localhost:5432/app;user=app;password=secret;",
//! )?;
//!
//! let conn = factory.open(&provider)?;
//! let mut stmt = conn.create_statement()?;
//! stmt.execute("SELECT 1")?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod connection;
pub mod error;
pub mod isolation;
pub mod provider;

pub use connection::{DriverConnection, SharedConnection, Statement};
pub use error::DriverError;
pub use isolation::IsolationLevel;
pub use provider::{ConnectionFactory, ProviderConfig};
