use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use rand::seq::SliceRandom;

use super::LockSet;
use crate::lock::{Lockable, RawTableLock, TableLock};
use crate::test_util::{self, AntiSemaphore, CONCURRENT_TEST_REPETITIONS};

#[test]
fn test_acquire_and_release() {
    test_util::init();

    let a = RawTableLock::new("a");
    let b = RawTableLock::new("b");

    {
        let set = LockSet::new([&a, &b, &a]);
        assert_eq!(set.len(), 2);
        assert!(a.is_owned_by_current_thread());
        assert!(b.is_owned_by_current_thread());
        assert_eq!(a.depth(), 1);
    }

    assert!(!a.is_locked());
    assert!(!b.is_locked());
}

#[test]
fn test_nested_set_is_recursive() {
    let a = RawTableLock::new("a");
    let b = RawTableLock::new("b");

    let _outer = LockSet::new([&a, &b]);
    {
        let _inner = LockSet::new([&b, &a]);
        assert_eq!(a.depth(), 2);
        assert_eq!(b.depth(), 2);
    }
    assert_eq!(a.depth(), 1);
    assert_eq!(b.depth(), 1);
}

#[test]
fn test_exclude_controlling() {
    let a = TableLock::new("a", ());
    let b = TableLock::new("b", ());
    let c = TableLock::new("c", ());

    let set = LockSet::builder().add(&a).add(&b).exclude(&b).exclude(&c).acquire();
    assert!(set.controlling(&a));
    assert!(!set.controlling(&b));
    assert!(!set.controlling(&c));
    assert!(!b.table_lock().is_locked());
    assert!(!c.table_lock().is_locked());

    let unrelated = RawTableLock::new("unrelated");
    assert!(!set.controlling(&unrelated));
}

#[test]
fn test_unlock_if_lock_if() {
    let a = RawTableLock::new("a");
    let b = RawTableLock::new("b");
    let c = RawTableLock::new("c");

    let mut set = LockSet::new([&a, &b, &c]);

    set.unlock_if(&[&b]);
    assert!(!b.is_locked());
    assert!(!set.is_held(&b));
    assert!(set.is_held(&a));
    assert!(set.is_held(&c));

    thread::scope(|scope| {
        scope.spawn(|| {
            assert!(b.try_lock());
            b.unlock();
            assert!(!c.try_lock());
        });
    });

    set.lock_if(&[&b]);
    assert!(set.is_held(&a));
    assert!(set.is_held(&b));
    assert!(set.is_held(&c));
    assert_eq!(c.depth(), 1);
}

#[test]
fn test_scoped_relock() {
    let a = TableLock::new("a", 0);
    let b = TableLock::new("b", 0);

    let mut set = LockSet::builder().add(&a).add(&b).acquire();
    {
        let relock = set.scoped_relock(&[&a]);
        assert!(!relock.set().is_held(&a));

        thread::scope(|scope| {
            scope.spawn(|| *a.lock() += 1);
        });
    }

    assert!(set.is_held(&a));
    assert!(set.is_held(&b));
    assert_eq!(*a.lock(), 1);
}

#[test]
fn test_disjoint_sets_run_concurrently() {
    test_util::init();

    let tables: Vec<RawTableLock> = (0..4).map(|_| RawTableLock::new("disjoint")).collect();
    let semaphore = AntiSemaphore::new(2);

    thread::scope(|scope| {
        let (left, right) = tables.split_at(2);
        for half in [left, right] {
            let semaphore = &semaphore;
            scope.spawn(move || {
                let _set = LockSet::new(half.iter());
                // both sets must be held at the same time to saturate
                semaphore.wait();
            });
        }
    });
}

#[test]
fn test_opposite_orders_do_not_deadlock() {
    test_util::init();

    let repetitions = (*CONCURRENT_TEST_REPETITIONS).min(200);

    test_util::with_watchdog(Duration::from_secs(30), move || {
        let tables: Vec<TableLock<usize>> =
            (0..4).map(|_| TableLock::new("contended", 0)).collect();
        let critical = AtomicUsize::new(0);

        for _ in 0..repetitions {
            thread::scope(|scope| {
                for thread_index in 0..4 {
                    let tables = &tables;
                    let critical = &critical;
                    scope.spawn(move || {
                        let mut rng = rand::thread_rng();
                        for _ in 0..50 {
                            let mut order: Vec<&TableLock<usize>> = tables.iter().collect();
                            order.shuffle(&mut rng);
                            if thread_index % 2 == 0 {
                                order.truncate(2);
                            }

                            let mut builder = LockSet::builder();
                            for table in &order {
                                builder = builder.add(*table);
                            }
                            let _set = builder.acquire();

                            for table in &order {
                                *table.lock() += 1;
                            }
                            critical.fetch_add(1, Ordering::Relaxed);
                        }
                    });
                }
            });
        }

        let total: usize = tables.iter().map(|table| *table.lock()).sum();
        assert_eq!(critical.load(Ordering::Relaxed), repetitions * 4 * 50);
        assert_eq!(total, repetitions * (2 * 50 * 2 + 2 * 50 * 4));
    });
}
