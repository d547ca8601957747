//! RhHashMap: the Robin-Hood open-addressing core with a debug reentrancy guard.

use crate::policy::{DefaultPolicy, TablePolicy};
use crate::reentrancy::DebugReentrancy;
use core::mem;
use std::collections::TryReserveError;

/// Maximum live entries per slot, expressed as the fraction
/// `MAX_LOAD_NUM / MAX_LOAD_DEN`. Growth triggers before an insert would
/// push the table past this bound.
const MAX_LOAD_NUM: usize = 3;
const MAX_LOAD_DEN: usize = 4;

/// Capacity multiplier applied on growth.
const GROWTH_FACTOR: usize = 2;

/// Slot count of the first allocation when no estimate was given.
const MIN_CAPACITY: usize = 8;

/// Failure to allocate or grow the backing array.
///
/// A failed growth leaves the map exactly as it was; a partially resized
/// table is never observable.
#[derive(Debug)]
pub enum AllocError {
    /// The allocator refused the request.
    Alloc(TryReserveError),
    /// The requested capacity exceeds what the index arithmetic supports.
    CapacityOverflow,
}

#[derive(Debug)]
struct Bucket<K, V> {
    // Cached so probing and rehashing never re-run the user's hash code.
    hash: u32,
    // Distance from the home slot `hash & mask`; kept exact by insertion
    // swaps and backward-shift deletion.
    dist: u32,
    key: K,
    value: V,
}

/// A hash map using open addressing with Robin-Hood displacement.
///
/// All key handling goes through the [`TablePolicy`]: the map never hashes
/// or compares keys itself, and every entry that leaves the map is handed
/// to the policy's `destroy` exactly once. The backing array length is
/// always zero or a power of two, and after any insert the live count
/// stays within the load bound.
///
/// This type is unsynchronized; mutation requires `&mut self`, so holding
/// an iterator while mutating is a compile error. The
/// [`SyncRhHashMap`](crate::SyncRhHashMap) wrapper serves callers that
/// need shared-reference access from several threads.
pub struct RhHashMap<K, V, P = DefaultPolicy> {
    slots: Vec<Option<Bucket<K, V>>>,
    count: usize,
    policy: P,
    // The policy's destroy, monomorphized at construction so the
    // unconditional Drop impl can run teardown without the trait bound.
    destroy: fn(&mut P, K, V),
    reentrancy: DebugReentrancy,
}

impl<K, V, P> RhHashMap<K, V, P>
where
    P: TablePolicy<K, V> + Default,
{
    /// An empty map. The backing array is first allocated on demand.
    pub fn new() -> Self {
        Self::with_policy(P::default())
    }

    /// An empty map pre-sized for `estimated` entries (0 selects the
    /// small default starting size).
    pub fn with_capacity(estimated: usize) -> Result<Self, AllocError> {
        Self::with_capacity_and_policy(estimated, P::default())
    }
}

impl<K, V, P> Default for RhHashMap<K, V, P>
where
    P: TablePolicy<K, V> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, P: TablePolicy<K, V>> RhHashMap<K, V, P> {
    pub fn with_policy(policy: P) -> Self {
        Self {
            slots: Vec::new(),
            count: 0,
            policy,
            destroy: <P as TablePolicy<K, V>>::destroy,
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn with_capacity_and_policy(estimated: usize, policy: P) -> Result<Self, AllocError> {
        let mut map = Self::with_policy(policy);
        rehash_into(&mut map.slots, capacity_for(estimated)?)?;
        Ok(map)
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of slots in the backing array, not the live-entry count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Insert `key -> value`.
    ///
    /// If an equal key is already present: with `replace` false, returns
    /// `Ok(false)` and the map is untouched (the rejected pair is dropped
    /// without the policy's `destroy`); with `replace` true, the new pair
    /// overwrites in place, the previous pair goes to `destroy`, and the
    /// result is `Ok(true)`. A fresh key always inserts as `Ok(true)`.
    ///
    /// Growth happens before probing when the insert would exceed the
    /// load bound; `Err` reports a failed allocation with the map left in
    /// its prior state.
    pub fn insert(&mut self, key: K, value: V, replace: bool) -> Result<bool, AllocError> {
        let Self {
            slots,
            count,
            policy,
            reentrancy,
            ..
        } = self;
        let _g = reentrancy.enter_mut();

        ensure_room(slots, *count + 1)?;
        let hash = policy.hash(&key);
        if let Some(idx) = probe(slots, &*policy, hash, &key) {
            if !replace {
                return Ok(false);
            }
            let slot = slots[idx].as_mut().expect("probe returned an occupied slot");
            let dist = slot.dist;
            let old = mem::replace(
                slot,
                Bucket {
                    hash,
                    dist,
                    key,
                    value,
                },
            );
            policy.destroy(old.key, old.value);
            return Ok(true);
        }
        place(
            slots,
            Bucket {
                hash,
                dist: 0,
                key,
                value,
            },
        );
        *count += 1;
        Ok(true)
    }

    /// Borrow the value for `key`, or `None` if absent.
    pub fn find(&self, key: &K) -> Option<&V> {
        let _g = self.reentrancy.enter();
        let hash = self.policy.hash(key);
        let idx = probe(&self.slots, &self.policy, hash, key)?;
        self.slots[idx].as_ref().map(|b| &b.value)
    }

    /// Mutably borrow the value for `key`, or `None` if absent.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let Self {
            slots,
            policy,
            reentrancy,
            ..
        } = self;
        let _g = reentrancy.enter();
        let hash = policy.hash(key);
        let idx = probe(slots, &*policy, hash, key)?;
        slots[idx].as_mut().map(|b| &mut b.value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        let _g = self.reentrancy.enter();
        let hash = self.policy.hash(key);
        probe(&self.slots, &self.policy, hash, key).is_some()
    }

    /// Remove the entry for `key`, handing the pair to the policy's
    /// `destroy`. Returns whether a key was removed.
    pub fn remove(&mut self, key: &K) -> bool {
        let Self {
            slots,
            count,
            policy,
            reentrancy,
            ..
        } = self;
        let _g = reentrancy.enter_mut();

        let hash = policy.hash(key);
        let Some(idx) = probe(slots, &*policy, hash, key) else {
            return false;
        };
        let removed = slots[idx].take().expect("probe returned an occupied slot");
        *count -= 1;
        shift_back(slots, idx);
        policy.destroy(removed.key, removed.value);
        true
    }

    /// Remove every entry, handing each pair to `destroy`. Capacity is
    /// retained, so clear-and-refill cycles do not reallocate.
    pub fn clear(&mut self) {
        let Self {
            slots,
            count,
            policy,
            reentrancy,
            ..
        } = self;
        let _g = reentrancy.enter_mut();

        *count = 0;
        for slot in slots.iter_mut() {
            if let Some(bucket) = slot.take() {
                policy.destroy(bucket.key, bucket.value);
            }
        }
    }

    /// Iterate live entries in arbitrary slot order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self.slots.iter(),
        }
    }

    /// Call `callback` once per live entry, in arbitrary order, stopping
    /// early as soon as it returns `false`.
    pub fn iterate<F>(&self, mut callback: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let _g = self.reentrancy.enter();
        for slot in self.slots.iter().flatten() {
            if !callback(&slot.key, &slot.value) {
                break;
            }
        }
    }

    // Structural self-check used by the property suites.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let cap = self.slots.len();
        let live = self.slots.iter().flatten().count();
        assert_eq!(live, self.count, "count must match occupied slots");
        if cap == 0 {
            assert_eq!(self.count, 0);
            return;
        }
        assert!(cap.is_power_of_two());
        assert!(
            self.count * MAX_LOAD_DEN <= cap * MAX_LOAD_NUM,
            "load bound violated: {} live in {} slots",
            self.count,
            cap
        );
        let mask = cap - 1;
        for (idx, slot) in self.slots.iter().enumerate() {
            let Some(bucket) = slot else { continue };
            let home = (bucket.hash as usize) & mask;
            let true_dist = (idx + cap - home) & mask;
            assert_eq!(
                true_dist, bucket.dist as usize,
                "cached displacement must be exact"
            );
            if bucket.dist > 0 {
                let prev = self.slots[(idx + cap - 1) & mask]
                    .as_ref()
                    .expect("a displaced entry must extend a run");
                assert!(
                    prev.dist + 1 >= bucket.dist,
                    "Robin-Hood ordering violated at slot {idx}"
                );
            }
        }
    }
}

impl<K, V, P> Drop for RhHashMap<K, V, P> {
    fn drop(&mut self) {
        self.count = 0;
        for slot in self.slots.iter_mut() {
            if let Some(bucket) = slot.take() {
                (self.destroy)(&mut self.policy, bucket.key, bucket.value);
            }
        }
    }
}

/// Iterator over live entries, in arbitrary slot order.
pub struct Iter<'a, K, V> {
    slots: core::slice::Iter<'a, Option<Bucket<K, V>>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Some(bucket) = slot {
                return Some((&bucket.key, &bucket.value));
            }
        }
        None
    }
}

// Smallest power-of-two slot count that keeps `estimated` entries within
// the load bound. An estimate of 0 selects the default starting size.
fn capacity_for(estimated: usize) -> Result<usize, AllocError> {
    let needed = estimated
        .checked_mul(MAX_LOAD_DEN)
        .ok_or(AllocError::CapacityOverflow)?
        .div_ceil(MAX_LOAD_NUM);
    needed
        .max(MIN_CAPACITY)
        .checked_next_power_of_two()
        .ok_or(AllocError::CapacityOverflow)
}

// Grow if holding `occupied` entries would exceed the load bound. The swap
// to the new array happens only after its allocation succeeded, so `Err`
// leaves the table untouched.
fn ensure_room<K, V>(slots: &mut Vec<Option<Bucket<K, V>>>, occupied: usize) -> Result<(), AllocError> {
    let cap = slots.len();
    if cap > 0 && occupied * MAX_LOAD_DEN <= cap * MAX_LOAD_NUM {
        return Ok(());
    }
    let new_cap = if cap == 0 {
        MIN_CAPACITY
    } else {
        cap.checked_mul(GROWTH_FACTOR)
            .ok_or(AllocError::CapacityOverflow)?
    };
    rehash_into(slots, new_cap)
}

fn rehash_into<K, V>(
    slots: &mut Vec<Option<Bucket<K, V>>>,
    new_cap: usize,
) -> Result<(), AllocError> {
    debug_assert!(new_cap.is_power_of_two());
    let mut fresh = Vec::new();
    fresh.try_reserve_exact(new_cap).map_err(AllocError::Alloc)?;
    fresh.resize_with(new_cap, || None);
    let old = mem::replace(slots, fresh);
    // Replay through the cached hash; user hashing code never runs here.
    for bucket in old.into_iter().flatten() {
        place(slots, Bucket { dist: 0, ..bucket });
    }
    Ok(())
}

// Robin-Hood displacement walk: the incoming entry claims the first slot
// whose resident sits closer to its own home, and the displaced resident
// continues down the run. Terminates because the load bound guarantees
// empty slots. Must only be called for keys not present in the table.
fn place<K, V>(slots: &mut [Option<Bucket<K, V>>], mut incoming: Bucket<K, V>) {
    debug_assert_eq!(incoming.dist, 0);
    let mask = slots.len() - 1;
    let mut idx = (incoming.hash as usize) & mask;
    loop {
        match &mut slots[idx] {
            slot @ None => {
                *slot = Some(incoming);
                return;
            }
            Some(resident) => {
                if resident.dist < incoming.dist {
                    mem::swap(resident, &mut incoming);
                }
            }
        }
        idx = (idx + 1) & mask;
        incoming.dist += 1;
    }
}

// Forward probe with a cached-hash short-circuit before the policy's
// equality, and Robin-Hood early termination: once a resident sits closer
// to its home than the probe has traveled, the key cannot appear further
// down the run.
fn probe<K, V, P: TablePolicy<K, V>>(
    slots: &[Option<Bucket<K, V>>],
    policy: &P,
    hash: u32,
    key: &K,
) -> Option<usize> {
    if slots.is_empty() {
        return None;
    }
    let mask = slots.len() - 1;
    let mut idx = (hash as usize) & mask;
    let mut dist = 0u32;
    loop {
        let bucket = slots[idx].as_ref()?;
        if bucket.dist < dist {
            return None;
        }
        if bucket.hash == hash && policy.eq(&bucket.key, key) {
            return Some(idx);
        }
        idx = (idx + 1) & mask;
        dist += 1;
    }
}

// Backward-shift deletion: slide the remainder of the probe run one slot
// toward its home, keeping the displacement ordering without tombstones.
fn shift_back<K, V>(slots: &mut [Option<Bucket<K, V>>], mut hole: usize) {
    let mask = slots.len() - 1;
    loop {
        let next = (hole + 1) & mask;
        match slots[next].take() {
            Some(mut bucket) if bucket.dist > 0 => {
                bucket.dist -= 1;
                slots[hole] = Some(bucket);
                hole = next;
            }
            run_end => {
                // Run ended: put back whatever was taken (a home-slot
                // entry or nothing).
                slots[next] = run_end;
                return;
            }
        }
    }
}
