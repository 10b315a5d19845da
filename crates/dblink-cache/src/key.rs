//! Compound, order-sensitive cache keys.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::component::KeyComponent;

const HASH_MULTIPLIER: u64 = 37;
const HASH_BASE: u64 = 17;

/// A compound lookup key built from a sequence of heterogeneous
/// components.
///
/// Three scalars are folded incrementally as components are added: a
/// count, a checksum (sum of component hashes), and a polynomial hash
/// that weights each component hash by its position, so `(a, b)` and
/// `(b, a)` produce different keys even when the component hashes sum
/// identically. Equality checks all three scalars and then the
/// components pairwise in order, so keys stay exact even under hash
/// collisions.
///
/// # Example
///
/// ```
/// use dblink_cache::CacheKey;
///
/// let mut key = CacheKey::new();
/// key.update("users.findByRole");
/// key.update("admin");
/// key.update(vec![0i64, 50]);
///
/// let mut same = CacheKey::new();
/// same.update_all(["users.findByRole", "admin"]);
/// same.update(vec![0i64, 50]);
///
/// assert_eq!(key, same);
/// ```
#[derive(Debug, Clone)]
pub struct CacheKey {
    hashcode: u64,
    checksum: u64,
    components: Vec<KeyComponent>,
    null_key: bool,
}

impl CacheKey {
    /// Create an empty key.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hashcode: HASH_BASE,
            checksum: 0,
            components: Vec::new(),
            null_key: false,
        }
    }

    /// Create the null sentinel key.
    ///
    /// The null key marks a lookup that must never hit a cache: it
    /// compares unequal to every ordinary key. Two null keys compare
    /// equal to each other.
    #[must_use]
    pub fn null() -> Self {
        Self {
            null_key: true,
            ..Self::new()
        }
    }

    /// Build a key from a sequence of components.
    pub fn from_components<I, C>(components: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<KeyComponent>,
    {
        let mut key = Self::new();
        key.update_all(components);
        key
    }

    /// Whether this is the null sentinel key.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.null_key
    }

    /// Append a component, folding its hash into the key's scalars.
    pub fn update(&mut self, component: impl Into<KeyComponent>) {
        let component = component.into();
        let base = component.fingerprint();
        let count = self.components.len() as u64 + 1;

        self.checksum = self.checksum.wrapping_add(base);
        self.hashcode = self
            .hashcode
            .wrapping_mul(HASH_MULTIPLIER)
            .wrapping_add(base.wrapping_mul(count));
        self.components.push(component);
    }

    /// Append each component of a sequence in order.
    ///
    /// Equivalent to calling [`update`](Self::update) repeatedly; the
    /// resulting key does not depend on how updates were batched.
    pub fn update_all<I, C>(&mut self, components: I)
    where
        I: IntoIterator<Item = C>,
        C: Into<KeyComponent>,
    {
        for component in components {
            self.update(component);
        }
    }

    /// Number of components in the key.
    #[must_use]
    pub fn count(&self) -> usize {
        self.components.len()
    }

    /// The folded polynomial hash.
    #[must_use]
    pub fn hashcode(&self) -> u64 {
        self.hashcode
    }

    /// The running sum of component hashes.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        self.checksum
    }

    /// The component sequence.
    #[must_use]
    pub fn components(&self) -> &[KeyComponent] {
        &self.components
    }
}

impl Default for CacheKey {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        if self.null_key || other.null_key {
            return self.null_key && other.null_key;
        }
        if self.hashcode != other.hashcode {
            return false;
        }
        if self.checksum != other.checksum {
            return false;
        }
        if self.components.len() != other.components.len() {
            return false;
        }
        self.components
            .iter()
            .zip(&other.components)
            .all(|(a, b)| a == b)
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hashcode.hash(state);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hashcode, self.checksum)?;
        for component in &self.components {
            write!(f, ":{component}")?;
        }
        Ok(())
    }
}
