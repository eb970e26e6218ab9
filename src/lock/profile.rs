//! Diagnoses pathological lock contention.
//!
//! When a [`RawTableLock`](super::RawTableLock) is created with a [`ContentionProfiler`],
//! every acquisition that had to wait records how long it waited
//! and which thread held the lock when the wait started.
//! A run of consecutive slow waits on the same lock is reported
//! to the subscribed [`ContentionObserver`]s and logged as a warning.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

/// Thresholds of a [`ContentionProfiler`].
#[derive(Debug, Clone)]
pub struct ProfilerConfig {
    /// A wait at least this long is pathological.
    pub threshold:   Duration,
    /// The number of consecutive pathological waits that triggers a report.
    pub consecutive: usize,
    /// The maximum number of samples kept per lock.
    pub chain_len:   usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self { threshold: Duration::from_micros(500), consecutive: 8, chain_len: 16 }
    }
}

/// One contended acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// The token of the thread holding the lock when the wait started, 0 if unknown.
    pub holder: usize,
    /// How long the acquisition waited.
    pub waited: Duration,
}

/// A run of pathological waits on one lock.
#[derive(Debug, Clone)]
pub struct ContentionReport {
    /// The name of the contended lock.
    pub lock:    &'static str,
    /// The most recent samples, oldest first.
    pub samples: Vec<Sample>,
}

impl ContentionReport {
    /// The longest wait in the report.
    pub fn max_wait(&self) -> Duration {
        self.samples.iter().map(|sample| sample.waited).max().unwrap_or_default()
    }
}

/// Receives contention reports.
pub trait ContentionObserver: Send + Sync {
    /// Called from the thread that completed the last pathological wait.
    fn on_contention(&self, report: &ContentionReport);
}

impl<F: Fn(&ContentionReport) + Send + Sync> ContentionObserver for F {
    fn on_contention(&self, report: &ContentionReport) { self(report) }
}

/// Shared configuration and subscribers of lock contention reports.
#[derive(Default)]
pub struct ContentionProfiler {
    config:    ProfilerConfig,
    observers: RwLock<Vec<Arc<dyn ContentionObserver>>>,
}

impl ContentionProfiler {
    /// Creates a profiler without observers.
    pub fn new(config: ProfilerConfig) -> Self { Self { config, observers: RwLock::default() } }

    /// The thresholds of this profiler.
    pub fn config(&self) -> &ProfilerConfig { &self.config }

    /// Subscribes an observer to future reports.
    pub fn subscribe(&self, observer: Arc<dyn ContentionObserver>) {
        self.observers.write().push(observer);
    }

    fn publish(&self, report: &ContentionReport) {
        log::warn!(
            "Lock {} waited pathologically {} times in a row (max {:?})",
            report.lock,
            report.samples.len(),
            report.max_wait(),
        );

        for observer in self.observers.read().iter() {
            observer.on_contention(report);
        }
    }
}

/// The per-lock state of a profiled lock.
pub(super) struct LockProfile {
    profiler: Arc<ContentionProfiler>,
    state:    Mutex<ProfileState>,
}

#[derive(Default)]
struct ProfileState {
    chain:  VecDeque<Sample>,
    streak: usize,
}

impl LockProfile {
    pub(super) fn new(profiler: Arc<ContentionProfiler>) -> Self {
        Self { profiler, state: Mutex::default() }
    }

    pub(super) fn record(&self, lock: &'static str, holder: usize, waited: Duration) {
        let config = &self.profiler.config;

        let report = {
            let mut state = self.state.lock();

            if waited < config.threshold {
                state.streak = 0;
                return;
            }

            if state.chain.len() >= config.chain_len.max(1) {
                state.chain.pop_front();
            }
            state.chain.push_back(Sample { holder, waited });
            state.streak += 1;

            if state.streak < config.consecutive {
                return;
            }

            state.streak = 0;
            ContentionReport { lock, samples: state.chain.drain(..).collect() }
        };

        self.profiler.publish(&report);
    }
}
