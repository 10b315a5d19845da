//! Cache key components.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// One component of a [`CacheKey`](crate::CacheKey).
///
/// Components cover the value shapes that show up in compound lookup keys:
/// scalars, strings, byte strings, and homogeneous arrays. Array hashing
/// and equality are order-sensitive. Floats hash and compare by bit
/// pattern, so a key built from the same float bits always matches.
#[derive(Debug, Clone)]
pub enum KeyComponent {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating-point number, hashed and compared by bit pattern.
    Float(f64),
    /// String.
    Str(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Array of integers.
    IntArray(Vec<i64>),
    /// Array of strings.
    StrArray(Vec<String>),
}

impl KeyComponent {
    /// Deterministic per-component hash folded into the owning key.
    ///
    /// A null component hashes to 1. Everything else runs through a
    /// `DefaultHasher` seeded identically per process, with the variant
    /// discriminant included so equal payloads of different shapes do not
    /// collide by construction.
    pub(crate) fn fingerprint(&self) -> u64 {
        match self {
            Self::Null => 1,
            other => {
                let mut hasher = DefaultHasher::new();
                other.hash(&mut hasher);
                hasher.finish()
            }
        }
    }
}

impl PartialEq for KeyComponent {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::IntArray(a), Self::IntArray(b)) => a == b,
            (Self::StrArray(a), Self::StrArray(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for KeyComponent {}

impl Hash for KeyComponent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::Int(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::Str(v) => v.hash(state),
            Self::Bytes(v) => v.hash(state),
            Self::IntArray(v) => v.hash(state),
            Self::StrArray(v) => v.hash(state),
        }
    }
}

impl fmt::Display for KeyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
            Self::Bytes(v) => write_array(f, v.iter()),
            Self::IntArray(v) => write_array(f, v.iter()),
            Self::StrArray(v) => write_array(f, v.iter()),
        }
    }
}

fn write_array<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "]")
}

impl From<bool> for KeyComponent {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for KeyComponent {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for KeyComponent {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for KeyComponent {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for KeyComponent {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for KeyComponent {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<u8>> for KeyComponent {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Vec<i64>> for KeyComponent {
    fn from(v: Vec<i64>) -> Self {
        Self::IntArray(v)
    }
}

impl From<&[i64]> for KeyComponent {
    fn from(v: &[i64]) -> Self {
        Self::IntArray(v.to_vec())
    }
}

impl From<Vec<String>> for KeyComponent {
    fn from(v: Vec<String>) -> Self {
        Self::StrArray(v)
    }
}

impl From<&[&str]> for KeyComponent {
    fn from(v: &[&str]) -> Self {
        Self::StrArray(v.iter().map(|s| (*s).to_string()).collect())
    }
}
