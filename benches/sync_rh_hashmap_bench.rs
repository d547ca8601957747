use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rh_hashmap::{IdPolicy, SyncRhHashMap};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

// Single-threaded passes through the lock, to measure the locking
// overhead against the unsynchronized benchmarks.

fn bench_insert_locked(c: &mut Criterion) {
    c.bench_function("sync_rh_hashmap_insert_10k", |b| {
        b.iter_batched(
            SyncRhHashMap::<u64, u64, IdPolicy>::new,
            |m| {
                for (i, x) in lcg(1).take(10_000).enumerate() {
                    m.insert(x, i as u64, false).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_locked(c: &mut Criterion) {
    c.bench_function("sync_rh_hashmap_get_hit", |b| {
        let m: SyncRhHashMap<u64, u64, IdPolicy> = SyncRhHashMap::new();
        let keys: Vec<u64> = lcg(7).take(20_000).collect();
        for (i, &k) in keys.iter().enumerate() {
            m.insert(k, i as u64, false).unwrap();
        }
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(m.get(k));
        })
    });
}

fn bench_contended_reads(c: &mut Criterion) {
    c.bench_function("sync_rh_hashmap_reads_4_threads", |b| {
        let m: SyncRhHashMap<u64, u64, IdPolicy> = SyncRhHashMap::new();
        let keys: Vec<u64> = lcg(17).take(4_096).collect();
        for &k in &keys {
            m.insert(k, k, false).unwrap();
        }
        let m = &m;
        b.iter(|| {
            std::thread::scope(|s| {
                for chunk in keys.chunks(keys.len() / 4) {
                    s.spawn(move || {
                        for k in chunk {
                            black_box(m.get(k));
                        }
                    });
                }
            })
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_insert_locked, bench_get_locked, bench_contended_reads
}
criterion_main!(benches);
