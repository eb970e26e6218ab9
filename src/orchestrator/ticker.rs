use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::Orchestrator;
use crate::tracer::Tracer;

struct Shared {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

/// A background thread ticking an orchestrator periodically.
///
/// The thread stops when the ticker is stopped or dropped.
/// A tick in progress always completes.
pub struct Ticker {
    shared: Arc<Shared>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Ticker {
    pub(super) fn spawn<T: Tracer + Send + 'static>(
        orchestrator: Arc<Orchestrator>,
        period: Duration,
        tracer: T,
    ) -> Self {
        let shared = Arc::new(Shared { stopped: Mutex::new(false), condvar: Condvar::new() });

        let thread = thread::Builder::new()
            .name("cookiejar ticker".into())
            .spawn({
                let shared = Arc::clone(&shared);
                move || run(&orchestrator, &shared, period, &tracer)
            })
            .expect("Failed to spawn ticker thread");

        Self { shared, thread: Some(thread) }
    }

    /// Stops the ticker and waits for the current tick to complete.
    pub fn stop(mut self) { self.stop_and_join(); }

    /// Whether the ticker thread is still running.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().map_or(false, |thread| !thread.is_finished())
    }

    fn stop_and_join(&mut self) {
        *self.shared.stopped.lock() = true;
        self.shared.condvar.notify_all();

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Ticker thread panicked");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) { self.stop_and_join(); }
}

fn run(orchestrator: &Orchestrator, shared: &Shared, period: Duration, tracer: &impl Tracer) {
    let mut deadline = Instant::now() + period;

    loop {
        {
            let mut stopped = shared.stopped.lock();
            while !*stopped {
                if shared.condvar.wait_until(&mut stopped, deadline).timed_out() {
                    break;
                }
            }
            if *stopped {
                return;
            }
        }

        // re-arm before ticking; missed periods are skipped instead of bursting
        let now = Instant::now();
        deadline += period;
        if deadline < now {
            deadline = now + period;
        }

        match orchestrator.tick(tracer) {
            Ok(stats) => log::trace!("Tick completed: {stats:?}"),
            Err(err) => log::error!("Tick failed: {err}"),
        }
    }
}
