//! Connection identity fingerprint.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Fingerprint of the (url, username, password) triple that produced a
/// connection.
///
/// Stable within a process run. Handles returning to the pool with a stale
/// fingerprint (the triple changed since checkout) are dropped instead of
/// recycled.
pub(crate) fn connection_type_code(url: &str, username: &str, password: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    username.hash(&mut hasher);
    password.hash(&mut hasher);
    hasher.finish()
}
