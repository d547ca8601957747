//! Debug-only reentrancy guard.
//!
//! Tracks entries into a data structure to detect accidental reentrancy or
//! unsynchronized aliasing. Shared entries (lookups, iteration) may overlap
//! freely, including across threads; an exclusive entry (any mutation)
//! requires the tracker to be completely idle. Violations panic in debug
//! builds. In release builds everything compiles to a zero-cost no-op.

#[cfg(debug_assertions)]
use core::sync::atomic::{AtomicIsize, Ordering};

/// Per-instance entry tracker. Embed in a struct and guard entry points
/// with `let _g = self.reentrancy.enter();` (shared) or
/// `let _g = self.reentrancy.enter_mut();` (exclusive).
#[derive(Debug, Default)]
pub struct DebugReentrancy {
    // Number of shared entries, or -1 while an exclusive entry is active.
    #[cfg(debug_assertions)]
    state: AtomicIsize,
}

impl DebugReentrancy {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            state: AtomicIsize::new(0),
        }
    }

    /// Enter a shared section. Panics in debug builds if an exclusive
    /// section is active.
    #[inline]
    pub fn enter(&self) -> SharedGuard<'_> {
        #[cfg(debug_assertions)]
        {
            let prev = self.state.fetch_add(1, Ordering::Acquire);
            assert!(
                prev >= 0,
                "reentrant map access: shared entry during an exclusive operation"
            );
        }
        SharedGuard { owner: self }
    }

    /// Enter an exclusive section. Panics in debug builds unless the
    /// tracker is idle.
    #[inline]
    pub fn enter_mut(&self) -> ExclusiveGuard<'_> {
        #[cfg(debug_assertions)]
        {
            let swapped =
                self.state
                    .compare_exchange(0, -1, Ordering::Acquire, Ordering::Relaxed);
            assert!(
                swapped.is_ok(),
                "reentrant map access: exclusive entry while the map is in use"
            );
        }
        ExclusiveGuard { owner: self }
    }
}

/// RAII guard for a shared section.
pub struct SharedGuard<'a> {
    #[allow(dead_code)]
    owner: &'a DebugReentrancy,
}

impl Drop for SharedGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let prev = self.owner.state.fetch_sub(1, Ordering::Release);
            debug_assert!(prev > 0);
        }
    }
}

/// RAII guard for an exclusive section.
pub struct ExclusiveGuard<'a> {
    #[allow(dead_code)]
    owner: &'a DebugReentrancy,
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            self.owner.state.store(0, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    #[test]
    fn enter_and_exit_is_ok() {
        let r = DebugReentrancy::new();
        let _g = r.enter_mut();
    }

    #[test]
    fn shared_entries_nest() {
        let r = DebugReentrancy::new();
        let _g1 = r.enter();
        let _g2 = r.enter();
    }

    #[test]
    fn exclusive_after_release_is_ok() {
        let r = DebugReentrancy::new();
        {
            let _g = r.enter();
        }
        let _g = r.enter_mut();
    }

    #[cfg(debug_assertions)]
    #[test]
    fn exclusive_during_shared_panics_in_debug() {
        let r = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _g1 = r.enter();
            let _g2 = r.enter_mut();
        }));
        assert!(
            res.is_err(),
            "expected exclusive overlap to panic in debug builds"
        );
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_exclusive_panics_in_debug() {
        let r = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _g1 = r.enter_mut();
            let _g2 = r.enter_mut();
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn guard_is_noop_in_release() {
        let r = DebugReentrancy::new();
        let _g1 = r.enter_mut();
        let _g2 = r.enter_mut();
    }
}
