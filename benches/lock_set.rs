use std::sync::Arc;
use std::thread;

use cookiejar::lock::{LockSet, Lockable, RawTableLock};
use criterion::*;
use rand::seq::SliceRandom;

fn make_locks(count: usize) -> Vec<RawTableLock> {
    (0..count).map(|_| RawTableLock::new("bench")).collect()
}

fn lock_set_acquire(c: &mut Criterion) {
    let mut group = c.benchmark_group("lock set acquire");

    for count in [1, 4, 16, 64] {
        let locks = make_locks(count);
        let mut shuffled: Vec<&RawTableLock> = locks.iter().collect();
        shuffled.shuffle(&mut rand::thread_rng());

        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(BenchmarkId::new("uncontended", format!("{count} tables")), |b| {
            b.iter(|| {
                let set = LockSet::new(shuffled.iter().copied());
                black_box(set.len())
            })
        });
        group.bench_function(BenchmarkId::new("relock", format!("{count} tables")), |b| {
            let mut set = LockSet::new(shuffled.iter().copied());
            let subset: Vec<&dyn Lockable> =
                shuffled.iter().step_by(2).map(|&lock| lock as &dyn Lockable).collect();
            b.iter(|| {
                let relock = set.scoped_relock(&subset);
                black_box(relock.set().len())
            })
        });
    }
}

fn lock_set_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("lock set contended");
    group.sample_size(20);

    for threads in [2, 4] {
        let locks = Arc::new(make_locks(16));
        let id = BenchmarkId::new("opposite orders", format!("{threads} threads"));
        group.bench_function(id, |b| {
            b.iter_custom(|iters| {
                let start = std::time::Instant::now();
                thread::scope(|scope| {
                    for t in 0..threads {
                        let locks = Arc::clone(&locks);
                        scope.spawn(move || {
                            let mut order: Vec<&RawTableLock> = locks.iter().collect();
                            if t % 2 == 1 {
                                order.reverse();
                            }
                            for _ in 0..iters {
                                let set = LockSet::new(order.iter().copied());
                                black_box(set.len());
                            }
                        });
                    }
                });
                start.elapsed()
            })
        });
    }
}

criterion_group!(benches, lock_set_acquire, lock_set_contended);
criterion_main!(benches);
