//! The worker pool used to run systems and parallel table iteration.

use std::cmp;
use std::ops::Range;

/// Runs a callable over ranges of indices in parallel.
pub trait WorkerPool: Send + Sync {
    /// The number of worker threads, 0 if everything runs on the calling thread.
    fn concurrency(&self) -> usize;

    /// Calls `f` with disjoint ranges covering `0..len` and returns after all calls complete.
    ///
    /// If `len` does not exceed `min_len`, `f` is called once on the calling thread.
    fn for_each_range(&self, len: usize, min_len: usize, f: &(dyn Fn(Range<usize>) + Sync));
}

/// Runs everything on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inline;

impl WorkerPool for Inline {
    fn concurrency(&self) -> usize { 0 }

    fn for_each_range(&self, len: usize, _min_len: usize, f: &(dyn Fn(Range<usize>) + Sync)) {
        if len > 0 {
            f(0..len);
        }
    }
}

/// A worker pool backed by a dedicated rayon thread pool.
pub struct RayonPool {
    pool:        rayon::ThreadPool,
    concurrency: usize,
}

impl RayonPool {
    /// Creates a pool with `concurrency` named worker threads.
    ///
    /// # Panics
    /// Panics if the operating system refuses to spawn the threads.
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            pool: rayon::ThreadPoolBuilder::new()
                .num_threads(concurrency)
                .thread_name(|i| format!("cookiejar worker #{}", i))
                .build()
                .expect("Failed to create thread pool"),
            concurrency,
        }
    }
}

impl WorkerPool for RayonPool {
    fn concurrency(&self) -> usize { self.concurrency }

    fn for_each_range(&self, len: usize, min_len: usize, f: &(dyn Fn(Range<usize>) + Sync)) {
        if len == 0 {
            return;
        }
        if len <= min_len {
            f(0..len);
            return;
        }

        let per_thread = (len + self.concurrency - 1) / self.concurrency;
        let chunk = per_thread.max(min_len).max(1);
        self.pool.scope(|scope| {
            for start in (0..len).step_by(chunk) {
                let end = cmp::min(start + chunk, len);
                scope.spawn(move |_| f(start..end));
            }
        });
    }
}
