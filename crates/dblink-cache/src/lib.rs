//! # dblink-cache
//!
//! Compound cache-key fingerprinting for the dblink connectivity toolkit.
//!
//! Higher layers cache lookups whose identity is a sequence of
//! heterogeneous values: a statement name, parameter values, a paging
//! window. [`CacheKey`] folds such a sequence into an order-sensitive
//! fingerprint while retaining the components themselves, so equality
//! stays exact even when hashes collide.
//!
//! ## Example
//!
//! ```
//! use dblink_cache::CacheKey;
//!
//! let mut key = CacheKey::new();
//! key.update("users.findByRole");
//! key.update("admin");
//!
//! let mut reversed = CacheKey::new();
//! reversed.update("admin");
//! reversed.update("users.findByRole");
//!
//! assert_ne!(key, reversed);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod component;
pub mod key;

pub use component::KeyComponent;
pub use key::CacheKey;
