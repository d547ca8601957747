//! Key policies: hashing, equality, and entry teardown.
//!
//! A policy is the single object that tells the map how to treat its keys
//! and what to do with entries that leave it. It replaces the usual trio of
//! hash callback, equality callback, and destroy callback threaded through
//! an opaque context pointer: the policy captures whatever context it needs
//! in its own fields.

use core::hash::{BuildHasher, Hash};
use core::ptr::NonNull;
use std::collections::hash_map::RandomState;

/// Hashing, equality, and teardown for map entries.
///
/// Contract: `eq` must be an equivalence relation, and keys equal under
/// `eq` must produce identical `hash` values. Hashes only need to be
/// deterministic for the lifetime of one map; they are never persisted.
pub trait TablePolicy<K, V> {
    /// 32-bit hash of `key`.
    fn hash(&self, key: &K) -> u32;

    /// Whether `a` and `b` are the same key.
    fn eq(&self, a: &K, b: &K) -> bool;

    /// Called exactly once for every entry that leaves the map, whether by
    /// `remove`, `clear`, replacement, or dropping the map itself. Never
    /// called for entries that merely failed to insert. Runs under the
    /// map's exclusive access and must not call back into the same map.
    fn destroy(&mut self, key: K, value: V) {
        let _ = (key, value);
    }
}

/// Policy for ordinary `Hash + Eq` keys, hashing through a standard
/// library `BuildHasher` folded down to 32 bits.
///
/// This is the default policy of both map types.
#[derive(Clone, Debug, Default)]
pub struct DefaultPolicy<S = RandomState> {
    build: S,
}

impl<S: BuildHasher> DefaultPolicy<S> {
    pub fn with_hasher(build: S) -> Self {
        Self { build }
    }
}

impl<K, V, S> TablePolicy<K, V> for DefaultPolicy<S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn hash(&self, key: &K) -> u32 {
        fold64(self.build.hash_one(key))
    }

    fn eq(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// Policy for byte-string keys compared by content: `String`, `&str`,
/// `Vec<u8>`, or anything else viewable as bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct BytesPolicy;

impl<K, V> TablePolicy<K, V> for BytesPolicy
where
    K: AsRef<[u8]>,
{
    fn hash(&self, key: &K) -> u32 {
        fnv1a(key.as_ref())
    }

    fn eq(&self, a: &K, b: &K) -> bool {
        a.as_ref() == b.as_ref()
    }
}

/// Policy for small integer identifiers. The full 64-bit avalanche keeps
/// dense ID ranges from clustering in the low bits the map indexes by.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdPolicy;

impl<K, V> TablePolicy<K, V> for IdPolicy
where
    K: Copy + Into<u64>,
{
    fn hash(&self, key: &K) -> u32 {
        mix64((*key).into())
    }

    fn eq(&self, a: &K, b: &K) -> bool {
        (*a).into() == (*b).into()
    }
}

/// Address extraction for pointer-identity keys.
pub trait PointerKey {
    fn addr(&self) -> usize;
}

impl<T> PointerKey for *const T {
    fn addr(&self) -> usize {
        *self as usize
    }
}

impl<T> PointerKey for *mut T {
    fn addr(&self) -> usize {
        *self as usize
    }
}

impl<T> PointerKey for NonNull<T> {
    fn addr(&self) -> usize {
        self.as_ptr() as usize
    }
}

impl<T> PointerKey for &T {
    fn addr(&self) -> usize {
        *self as *const T as usize
    }
}

/// Policy for pointer-identity keys: the address is the key. Two pointers
/// are the same key iff they point at the same location.
#[derive(Clone, Copy, Debug, Default)]
pub struct PtrPolicy;

impl<K, V> TablePolicy<K, V> for PtrPolicy
where
    K: PointerKey,
{
    fn hash(&self, key: &K) -> u32 {
        mix64(key.addr() as u64)
    }

    fn eq(&self, a: &K, b: &K) -> bool {
        a.addr() == b.addr()
    }
}

/// Wraps a policy with a teardown hook, called once per departing entry.
///
/// The hook owns its captures, so per-map teardown context needs no side
/// channel. `hash` and `eq` delegate to the wrapped policy.
pub struct DestroyHook<P, F> {
    inner: P,
    hook: F,
}

impl<P, F> DestroyHook<P, F> {
    pub fn new(inner: P, hook: F) -> Self {
        Self { inner, hook }
    }
}

impl<K, V, P, F> TablePolicy<K, V> for DestroyHook<P, F>
where
    P: TablePolicy<K, V>,
    F: FnMut(K, V),
{
    fn hash(&self, key: &K) -> u32 {
        self.inner.hash(key)
    }

    fn eq(&self, a: &K, b: &K) -> bool {
        self.inner.eq(a, b)
    }

    fn destroy(&mut self, key: K, value: V) {
        (self.hook)(key, value)
    }
}

/// FNV-1a over a byte slice, 32-bit variant.
fn fnv1a(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    bytes
        .iter()
        .fold(OFFSET_BASIS, |h, &b| (h ^ u32::from(b)).wrapping_mul(PRIME))
}

/// 64-bit avalanche (murmur-style fmix64) folded to 32 bits.
fn mix64(mut x: u64) -> u32 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^= x >> 33;
    fold64(x)
}

/// Fold a 64-bit hash to 32 bits without discarding the high half.
fn fold64(x: u64) -> u32 {
    (x ^ (x >> 32)) as u32
}
