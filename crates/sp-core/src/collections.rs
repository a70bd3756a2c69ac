//! Shared collection abstractions.
//!
//! `ConcurrentMap` wraps `dashmap::DashMap` so the frozen symbol table can
//! memoize classifications behind `&self` while shared across threads.

use dashmap::DashMap;
use std::hash::Hash;

pub struct ConcurrentMap<K, V> {
    inner: DashMap<K, V>,
}

impl<K, V> Default for ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> std::fmt::Debug for ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentMap")
            .field("len", &self.inner.len())
            .finish()
    }
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.get(key).map(|entry| entry.value().clone())
    }

    /// Returns the cached value, computing and storing it on a miss.
    ///
    /// `init` runs outside the shard lock, so it may itself read the map.
    pub fn get_or_insert_with<F>(&self, key: K, init: F) -> V
    where
        V: Clone,
        F: FnOnce() -> V,
    {
        if let Some(hit) = self.get_cloned(&key) {
            return hit;
        }
        let value = init();
        self.inner.entry(key).or_insert(value).value().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_once_per_key() {
        let map = ConcurrentMap::new();
        let mut calls = 0;
        assert_eq!(
            map.get_or_insert_with(1u32, || {
                calls += 1;
                "a"
            }),
            "a"
        );
        assert_eq!(
            map.get_or_insert_with(1u32, || {
                calls += 1;
                "b"
            }),
            "a"
        );
        assert_eq!(calls, 1);
        assert_eq!(map.get_cloned(&1), Some("a"));
        assert_eq!(map.get_cloned(&2), None);
    }
}
