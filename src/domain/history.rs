//! Ordered key sequences describing the position of an element in a hierarchy.

use std::fmt;
use std::ops::Deref;

use itertools::Itertools;

/// Ancestor keys from the root (inclusive) down to, but excluding, an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct History<K>(Vec<K>);

impl<K> History<K> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Copy of this history extended by `key`. The receiver stays untouched.
    pub fn add(&self, key: K) -> Self
    where
        K: Clone,
    {
        let mut keys = Vec::with_capacity(self.0.len() + 1);
        keys.extend(self.0.iter().cloned());
        keys.push(key);
        Self(keys)
    }

    pub fn as_slice(&self) -> &[K] {
        &self.0
    }
}

impl<K: PartialEq> History<K> {
    pub fn contains_key(&self, key: &K) -> bool {
        self.0.iter().any(|k| k == key)
    }

    /// True if `prefix` is a (possibly equal) leading part of this history.
    pub fn has_prefix(&self, prefix: &[K]) -> bool {
        has_prefix(&self.0, prefix)
    }
}

impl<K: fmt::Display> History<K> {
    pub fn join(&self, separator: &str) -> String {
        join(&self.0, separator)
    }
}

impl<K> From<Vec<K>> for History<K> {
    fn from(keys: Vec<K>) -> Self {
        Self(keys)
    }
}

impl<K: Clone> From<&[K]> for History<K> {
    fn from(keys: &[K]) -> Self {
        Self(keys.to_vec())
    }
}

impl<K> FromIterator<K> for History<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<K> Deref for History<K> {
    type Target = [K];

    fn deref(&self) -> &[K] {
        &self.0
    }
}

impl<K: fmt::Display> fmt::Display for History<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.join("->"))
    }
}

pub fn has_prefix<K: PartialEq>(path: &[K], prefix: &[K]) -> bool {
    prefix.len() <= path.len() && path.iter().zip(prefix).all(|(a, b)| a == b)
}

pub fn join<K: fmt::Display>(keys: &[K], separator: &str) -> String {
    keys.iter().join(separator)
}
