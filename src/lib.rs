//! rh-hashmap: an open-addressing hash map with Robin-Hood displacement,
//! pluggable key policies, and an optional reader-writer synchronized
//! variant.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a reusable map engine that never interprets its keys or values
//!   itself; hashing, equality, and teardown all go through a
//!   caller-supplied policy object, so one engine serves string keys,
//!   integer IDs, pointer identity, or anything else.
//! - Layers:
//!   - TablePolicy<K, V> (in `policy`): the hashing/equality/teardown
//!     functor, with builtin policies for `Hash + Eq` keys, byte strings,
//!     integer IDs, and pointers, plus a `DestroyHook` combinator for
//!     teardown callbacks.
//!   - RhHashMap<K, V, P>: the unsynchronized core. Power-of-two backing
//!     array, cached 32-bit hashes, Robin-Hood insertion, backward-shift
//!     deletion, fallible doubling growth; includes a debug-only
//!     reentrancy guard.
//!   - SyncRhHashMap<K, V, P>: the core behind a `parking_lot::RwLock`
//!     with a `&self` surface; lookups share the lock, mutations own it.
//!
//! Probing invariants
//! - The backing array length is always zero or a power of two, and after
//!   any insert the live count stays within the load bound (3/4).
//! - Robin-Hood ordering: walking forward from any home slot, entries in
//!   a run never get closer to their own homes, which bounds probe-length
//!   variance and lets lookups stop early at a richer resident.
//! - Each bucket caches its 32-bit hash and exact displacement; growth
//!   replays buckets through the cached hash, so user hashing code is
//!   never invoked after an entry is first inserted.
//!
//! Teardown semantics
//! - Every entry that logically leaves the map (remove, clear,
//!   replacement, or dropping the map) is handed to the policy's
//!   `destroy` exactly once. Pairs rejected by a duplicate-key insert
//!   never were in the map and are dropped without it.
//!
//! Reentrancy policy
//! - Policy code (hash, eq, destroy) must not call back into the map it
//!   serves. The unsynchronized type makes most such misuse a compile
//!   error through `&mut` receivers; what borrow rules cannot see (raw
//!   pointer aliasing, lock-sharing mistakes) a debug-only guard catches
//!   by panicking. The synchronized type's lock is not reentrant, so a
//!   read-locked callback taking a write lock deadlocks; this is a
//!   documented precondition, not a recoverable error.
//!
//! Error model
//! - Absent keys and rejected duplicates are ordinary `bool`/`Option`
//!   results. The only error is `AllocError`, from constructors that
//!   pre-size and from inserts that must grow; a failed growth leaves the
//!   map in its prior state.
//!
//! Notes and non-goals
//! - No persistence, no ordered iteration, no cross-process sharing.
//! - Borrowed-key lookups (`Borrow<Q>`-style) are not offered; the policy
//!   defines hashing over `K` itself.
//! - Load factor, growth multiplier, and the default starting size are
//!   named constants in `rh_hash_map`.

mod policy;
mod reentrancy;
mod rh_hash_map;
mod rh_hash_map_proptest;
mod sync_rh_hash_map;

// Public surface
pub use policy::{
    BytesPolicy, DefaultPolicy, DestroyHook, IdPolicy, PointerKey, PtrPolicy, TablePolicy,
};
pub use reentrancy::DebugReentrancy;
pub use rh_hash_map::{AllocError, Iter, RhHashMap};
pub use sync_rh_hash_map::SyncRhHashMap;
