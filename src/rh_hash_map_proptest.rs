#![cfg(test)]

// Property tests for RhHashMap kept inside the crate so each step can call
// the internal structural self-check (`assert_invariants`) on top of the
// model-parity assertions.

use crate::policy::{BytesPolicy, DestroyHook, TablePolicy};
use crate::rh_hash_map::RhHashMap;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// keys, pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32, bool),
    Remove(usize),
    Find(usize),
    GetMut(usize, i32),
    Iterate,
    Clear,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>(), any::<bool>())
                .prop_map(|(i, v, r)| Op::Insert(i, v, r)),
            2 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::Find),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::GetMut(i, d)),
            1 => Just(Op::Iterate),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

type DestroyLog = Rc<RefCell<Vec<(String, i32)>>>;

// Drives a random operation sequence against the map and a
// std::collections::HashMap model. Checked after every operation:
// - insert/remove/find/get_mut outcome parity with the model;
// - iter() key-set parity;
// - len/is_empty parity;
// - the structural invariants (Robin-Hood ordering, exact cached
//   displacement, count agreement, load bound);
// - destroy accounting: the multiset of destroyed pairs matches exactly
//   the pairs the model says were replaced, removed, or cleared.
fn run_state_machine<P>(
    pool: &[String],
    ops: Vec<Op>,
    sut: &mut RhHashMap<String, i32, P>,
    destroyed: &DestroyLog,
) -> Result<(), TestCaseError>
where
    P: TablePolicy<String, i32>,
{
    let mut model: HashMap<String, i32> = HashMap::new();
    let mut expected_destroyed: Vec<(String, i32)> = Vec::new();

    for op in ops {
        match op {
            Op::Insert(i, v, replace) => {
                let k = pool[i].clone();
                let already = model.contains_key(&k);
                let inserted = sut.insert(k.clone(), v, replace).expect("allocation");
                if already && !replace {
                    prop_assert!(!inserted, "duplicate with replace=false must reject");
                } else {
                    prop_assert!(inserted);
                    if let Some(old) = model.insert(k.clone(), v) {
                        expected_destroyed.push((k, old));
                    }
                }
            }
            Op::Remove(i) => {
                let k = pool[i].clone();
                let removed = sut.remove(&k);
                match model.remove(&k) {
                    Some(v) => {
                        prop_assert!(removed);
                        expected_destroyed.push((k, v));
                    }
                    None => prop_assert!(!removed, "removing an absent key must report false"),
                }
            }
            Op::Find(i) => {
                let k = pool[i].clone();
                prop_assert_eq!(sut.find(&k), model.get(&k));
            }
            Op::GetMut(i, d) => {
                let k = pool[i].clone();
                match (sut.get_mut(&k), model.get_mut(&k)) {
                    (Some(sv), Some(mv)) => {
                        *sv = sv.saturating_add(d);
                        *mv = mv.saturating_add(d);
                    }
                    (None, None) => {}
                    _ => prop_assert!(false, "get_mut presence diverged from the model"),
                }
            }
            Op::Iterate => {
                let s_keys: BTreeSet<String> = sut.iter().map(|(k, _)| k.clone()).collect();
                let m_keys: BTreeSet<String> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
            Op::Clear => {
                for (k, v) in model.drain() {
                    expected_destroyed.push((k, v));
                }
                sut.clear();
            }
        }

        // Post-conditions after each op.
        sut.assert_invariants();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());

        let mut got = destroyed.borrow().clone();
        got.sort();
        let mut want = expected_destroyed.clone();
        want.sort();
        prop_assert_eq!(got, want);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let destroyed: DestroyLog = Rc::new(RefCell::new(Vec::new()));
        let sink = destroyed.clone();
        let mut sut = RhHashMap::with_policy(DestroyHook::new(
            BytesPolicy,
            move |k, v| sink.borrow_mut().push((k, v)),
        ));
        run_state_machine(&pool, ops, &mut sut, &destroyed)?;
    }
}

// Collision variant: a constant hash forces every key into one probe run,
// stressing displacement ordering, equality resolution, and
// backward-shift deletion.
#[derive(Clone, Copy, Debug, Default)]
struct CollidingBytes;

impl<K, V> TablePolicy<K, V> for CollidingBytes
where
    K: AsRef<[u8]>,
{
    fn hash(&self, _key: &K) -> u32 {
        0
    }
    fn eq(&self, a: &K, b: &K) -> bool {
        a.as_ref() == b.as_ref()
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let destroyed: DestroyLog = Rc::new(RefCell::new(Vec::new()));
        let sink = destroyed.clone();
        let mut sut = RhHashMap::with_policy(DestroyHook::new(
            CollidingBytes,
            move |k, v| sink.borrow_mut().push((k, v)),
        ));
        run_state_machine(&pool, ops, &mut sut, &destroyed)?;
    }
}
