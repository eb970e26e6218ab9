#![allow(missing_docs)]

use std::sync::mpsc;
use std::time::Duration;
use std::{env, fmt, panic, thread};

use parking_lot::{Condvar, Mutex, Once};

use crate::handle::HandleId;
use crate::orchestrator::TickStats;
use crate::tracer::Tracer;

lazy_static::lazy_static! {
    /// How many times concurrent tests repeat their racy section.
    ///
    /// Read from the `CONCURRENT_TEST_REPETITIONS` environment variable.
    /// Defaults to 1 when `RUST_LOG` is set, since logging slows every repetition down.
    pub static ref CONCURRENT_TEST_REPETITIONS: usize = env::var("CONCURRENT_TEST_REPETITIONS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(if env::var_os("RUST_LOG").is_some() { 1 } else { 100 });
}

/// Initializes `env_logger` once per process.
pub fn init() {
    static LOGGER: Once = Once::new();
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Runs `f` on another thread and panics if it does not complete within `timeout`.
///
/// Panics from `f` are propagated to the caller.
pub fn with_watchdog<R: Send + 'static>(
    timeout: Duration,
    f: impl FnOnce() -> R + Send + 'static,
) -> R {
    let (sender, receiver) = mpsc::channel();
    let thread = thread::Builder::new()
        .name("watched test".into())
        .spawn(move || {
            let result = f();
            // the receiver is gone if the watchdog already fired
            let _ = sender.send(result);
        })
        .expect("Failed to spawn watched thread");

    match receiver.recv_timeout(timeout) {
        Ok(result) => {
            thread.join().expect("watched thread completed");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("Deadlock: watched closure did not complete within {timeout:?}")
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match thread.join() {
            Err(payload) => panic::resume_unwind(payload),
            Ok(()) => unreachable!("watched thread exited without sending its result"),
        },
    }
}

/// Collects events from any thread and asserts a partial order among them.
pub struct EventTracer<T> {
    /// `(earlier, later)` pairs.
    orders: Vec<(T, T)>,
    events: Mutex<Vec<T>>,
}

impl<T: fmt::Debug + PartialEq> EventTracer<T> {
    /// `orders` lists `(earlier, later)` pairs:
    /// `later` may only be traced once `earlier` has been traced.
    pub fn new(orders: impl IntoIterator<Item = (T, T)>) -> Self {
        Self { orders: orders.into_iter().collect(), events: Mutex::new(Vec::new()) }
    }

    /// # Panics
    /// Panics if `event` was already traced or an earlier event is missing.
    pub fn trace(&self, event: T) {
        let mut events = self.events.lock();
        assert!(!events.contains(&event), "{event:?} traced twice");

        let missing = self
            .orders
            .iter()
            .filter(|(_, later)| *later == event)
            .find(|(earlier, _)| !events.contains(earlier));
        if let Some((earlier, _)) = missing {
            panic!("{event:?} traced before {earlier:?}");
        }

        events.push(event);
    }

    /// The traced events in the order they were traced.
    pub fn into_events(self) -> Vec<T> { self.events.into_inner() }
}

/// Tick-level events recorded by an [`EventTracer`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TickEvent {
    StartTick,
    EndTick,
    StartSystem(String),
    EndSystem(String),
    SkipSystem(String),
    CommitDestruction(usize),
    CommitCreation(usize),
}

impl Tracer for EventTracer<TickEvent> {
    type TickContext = ();
    fn start_tick(&self) { self.trace(TickEvent::StartTick) }
    fn end_tick(&self, _: (), _: &TickStats) { self.trace(TickEvent::EndTick) }

    type RunSystemContext = ();
    fn start_run_system(&self, name: &str) { self.trace(TickEvent::StartSystem(name.into())) }
    fn end_run_system(&self, _: (), name: &str, _: bool) {
        self.trace(TickEvent::EndSystem(name.into()))
    }

    fn skip_system(&self, name: &str) { self.trace(TickEvent::SkipSystem(name.into())) }

    fn commit_destruction(&self, count: usize) {
        self.trace(TickEvent::CommitDestruction(count))
    }

    fn commit_creation(&self, count: usize) { self.trace(TickEvent::CommitCreation(count)) }
}

/// A barrier that panics instead of blocking forever.
///
/// `wait` returns only once `parties` threads are inside it at the same time,
/// which proves that none of them excludes the others.
#[derive(Debug)]
pub struct AntiSemaphore {
    parties: usize,
    state:   Mutex<(usize, u64)>,
    condvar: Condvar,
}

impl AntiSemaphore {
    pub fn new(parties: usize) -> Self {
        Self { parties, state: Mutex::new((0, 0)), condvar: Condvar::new() }
    }

    pub fn wait(&self) {
        const TIMEOUT: Duration = Duration::from_secs(5);

        let mut state = self.state.lock();
        let round = state.1;
        state.0 += 1;
        log::trace!("{} of {} parties arrived in round {round}", state.0, self.parties);

        if state.0 == self.parties {
            *state = (0, round + 1);
            self.condvar.notify_all();
            return;
        }

        while state.1 == round {
            if self.condvar.wait_for(&mut state, TIMEOUT).timed_out() {
                panic!("Deadlock: only {} of {} parties arrived", state.0, self.parties);
            }
        }
    }
}

/// A position record.
#[derive(Debug, Clone, PartialEq, crate::Record)]
#[record(jar_as(crate))]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// A velocity record with a custom table name.
#[derive(Debug, Clone, PartialEq, crate::Record)]
#[record(jar_as(crate), name = "velocities")]
pub struct Velocity(pub f32, pub f32);

/// A record referencing external resources through handles.
#[derive(Debug, Clone, PartialEq, crate::Record)]
#[record(jar_as(crate))]
pub struct Sprite {
    #[record(handle)]
    pub texture: HandleId,
    #[record(handle)]
    pub palette: Option<HandleId>,
    pub layer:   u8,
}

/// A named configuration record for shared tables.
#[derive(Debug, Clone, PartialEq, crate::Record)]
#[record(jar_as(crate))]
pub struct Setting(pub String);
