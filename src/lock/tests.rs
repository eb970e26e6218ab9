use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::profile::{ContentionProfiler, ContentionReport, ProfilerConfig};
use super::{RawTableLock, TableLock};
use crate::test_util;

#[test]
fn test_recursive_lock() {
    test_util::init();

    let lock = RawTableLock::new("recursive");
    lock.lock();
    lock.lock();
    assert!(lock.try_lock());
    assert_eq!(lock.depth(), 3);

    lock.unlock();
    lock.unlock();
    assert!(lock.is_locked());
    lock.unlock();
    assert!(!lock.is_locked());
    assert_eq!(lock.depth(), 0);
}

#[test]
fn test_try_lock_from_other_thread() {
    test_util::init();

    let lock = RawTableLock::new("contended");
    lock.lock();

    thread::scope(|scope| {
        scope.spawn(|| {
            assert!(!lock.try_lock());
            assert!(!lock.is_owned_by_current_thread());
        });
    });

    lock.unlock();

    thread::scope(|scope| {
        scope.spawn(|| {
            assert!(lock.try_lock());
            lock.unlock();
        });
    });
}

#[test]
#[should_panic = "released by a thread that does not hold it"]
fn test_unlock_unheld_panics() {
    let lock = RawTableLock::new("unheld");
    lock.unlock();
}

#[test]
fn test_mutual_exclusion() {
    test_util::init();

    const THREADS: usize = 8;
    const ROUNDS: usize = 2000;

    let counter = TableLock::new("counter", 0usize);
    let inside = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..ROUNDS {
                    let mut guard = counter.lock();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    *guard += 1;
                    inside.fetch_sub(1, Ordering::SeqCst);
                }
            });
        }
    });

    assert_eq!(*counter.lock(), THREADS * ROUNDS);
}

#[test]
fn test_guard_under_held_raw_lock() {
    let table = TableLock::new("values", vec![1, 2, 3]);

    super::Lockable::table_lock(&table).lock();
    table.lock().push(4);
    assert_eq!(table.lock().len(), 4);
    super::Lockable::table_lock(&table).unlock();

    assert!(!super::Lockable::table_lock(&table).is_locked());
}

#[test]
#[should_panic = "nested table guards are not supported"]
fn test_nested_guard_panics() {
    let table = TableLock::new("nested", 0);
    let _outer = table.lock();
    let _inner = table.lock();
}

#[test]
fn test_profiler_reports_consecutive_slow_waits() {
    test_util::init();

    let profiler = Arc::new(ContentionProfiler::new(ProfilerConfig {
        threshold:   Duration::from_millis(1),
        consecutive: 2,
        chain_len:   4,
    }));
    let reports = Arc::new(Mutex::new(Vec::<ContentionReport>::new()));
    profiler.subscribe(Arc::new({
        let reports = Arc::clone(&reports);
        move |report: &ContentionReport| reports.lock().push(report.clone())
    }));

    let lock = RawTableLock::with_options("profiled", 4, Some(Arc::clone(&profiler)));

    for _ in 0..2 {
        lock.lock();
        thread::scope(|scope| {
            let waiter = scope.spawn(|| {
                lock.lock();
                lock.unlock();
            });
            // wait until the waiter parks, which guarantees a slow acquisition
            while !waiter.is_finished() && lock.state.load(Ordering::Relaxed) & super::PARKED == 0 {
                thread::yield_now();
            }
            thread::sleep(Duration::from_millis(5));
            lock.unlock();
        });
    }

    let reports = reports.lock();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].lock, "profiled");
    assert_eq!(reports[0].samples.len(), 2);
    assert!(reports[0].max_wait() >= Duration::from_millis(1));
}
