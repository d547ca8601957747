//! SyncRhHashMap: reader-writer synchronized wrapper around the core map.

use crate::policy::{DefaultPolicy, TablePolicy};
use crate::rh_hash_map::{AllocError, RhHashMap};
use parking_lot::RwLock;

/// A [`RhHashMap`] behind a reader-writer lock, usable through `&self`
/// from any number of threads.
///
/// Lookups, iteration, and emptiness checks take shared (read) access and
/// run in parallel; `insert`, `remove`, and `clear` take exclusive (write)
/// access and serialize against everything else.
///
/// The lock is not reentrant. A callback running under the read guard
/// (`with_value`, `iterate`) must not call a write operation on the same
/// map, and the policy's `destroy` runs under the write guard and must not
/// call back in; either case deadlocks rather than erroring.
pub struct SyncRhHashMap<K, V, P = DefaultPolicy> {
    inner: RwLock<RhHashMap<K, V, P>>,
}

impl<K, V, P> SyncRhHashMap<K, V, P>
where
    P: TablePolicy<K, V> + Default,
{
    pub fn new() -> Self {
        Self::from_map(RhHashMap::new())
    }

    pub fn with_capacity(estimated: usize) -> Result<Self, AllocError> {
        Ok(Self::from_map(RhHashMap::with_capacity(estimated)?))
    }
}

impl<K, V, P> Default for SyncRhHashMap<K, V, P>
where
    P: TablePolicy<K, V> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, P: TablePolicy<K, V>> SyncRhHashMap<K, V, P> {
    pub fn with_policy(policy: P) -> Self {
        Self::from_map(RhHashMap::with_policy(policy))
    }

    pub fn with_capacity_and_policy(estimated: usize, policy: P) -> Result<Self, AllocError> {
        Ok(Self::from_map(RhHashMap::with_capacity_and_policy(
            estimated, policy,
        )?))
    }

    /// Wrap an existing unsynchronized map.
    pub fn from_map(map: RhHashMap<K, V, P>) -> Self {
        Self {
            inner: RwLock::new(map),
        }
    }

    /// Recover the unsynchronized map, e.g. for single-threaded teardown.
    pub fn into_inner(self) -> RhHashMap<K, V, P> {
        self.inner.into_inner()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Clone out the value for `key`, or `None` if absent.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.read().find(key).cloned()
    }

    /// Run `f` against the value for `key` under the read guard.
    pub fn with_value<F, R>(&self, key: &K, f: F) -> Option<R>
    where
        F: FnOnce(&V) -> R,
    {
        let guard = self.inner.read();
        guard.find(key).map(f)
    }

    /// See [`RhHashMap::insert`]. Takes the write lock.
    pub fn insert(&self, key: K, value: V, replace: bool) -> Result<bool, AllocError> {
        self.inner.write().insert(key, value, replace)
    }

    /// See [`RhHashMap::remove`]. Takes the write lock.
    pub fn remove(&self, key: &K) -> bool {
        self.inner.write().remove(key)
    }

    /// See [`RhHashMap::clear`]. Takes the write lock.
    pub fn clear(&self) {
        self.inner.write().clear()
    }

    /// Call `callback` once per live entry under the read guard, stopping
    /// early as soon as it returns `false`. Writers block until the full
    /// pass finishes, so keep callbacks short.
    pub fn iterate<F>(&self, callback: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.inner.read().iterate(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::IdPolicy;

    /// Invariant: the synchronized surface round-trips entries like the
    /// core map does.
    #[test]
    fn insert_get_remove_roundtrip() {
        let m: SyncRhHashMap<u64, String, IdPolicy> = SyncRhHashMap::new();
        assert!(m.insert(1, "one".to_string(), false).unwrap());
        assert_eq!(m.get(&1), Some("one".to_string()));
        assert_eq!(m.with_value(&1, |v| v.len()), Some(3));
        assert!(m.contains_key(&1));
        assert!(m.remove(&1));
        assert!(m.is_empty());
        assert_eq!(m.get(&1), None);
    }

    /// Invariant: `into_inner` hands back the core map with its contents.
    #[test]
    fn into_inner_preserves_entries() {
        let m: SyncRhHashMap<u64, u64, IdPolicy> = SyncRhHashMap::new();
        for k in 0..10 {
            m.insert(k, k * k, false).unwrap();
        }
        let core = m.into_inner();
        assert_eq!(core.len(), 10);
        assert_eq!(core.find(&3), Some(&9));
    }
}
