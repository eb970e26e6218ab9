//! Exposes testing, profiling and tracing capabilities.

use std::{fmt, time};

use crate::orchestrator::TickStats;

/// A handler that receives tick-level events of the orchestrator.
///
/// Methods with a `start_` prefix return a context
/// that is passed back to the matching `end_` method.
/// System events are delivered on the worker thread running the system.
pub trait Tracer: Sync {
    /// Context from [`start_tick`](Self::start_tick) to [`end_tick`](Self::end_tick).
    type TickContext;
    /// A tick starts.
    fn start_tick(&self) -> Self::TickContext;
    /// A tick ends.
    fn end_tick(&self, context: Self::TickContext, stats: &TickStats);

    /// Context from [`start_run_system`](Self::start_run_system)
    /// to [`end_run_system`](Self::end_run_system).
    type RunSystemContext;
    /// A system starts running.
    fn start_run_system(&self, name: &str) -> Self::RunSystemContext;
    /// A system stops running.
    fn end_run_system(&self, context: Self::RunSystemContext, name: &str, ok: bool);

    /// A system was not run because it is paused, not ready or subordinate to another system.
    fn skip_system(&self, name: &str);

    /// Queued destructions have been committed.
    fn commit_destruction(&self, count: usize);

    /// Queued creations have been committed.
    fn commit_creation(&self, count: usize);
}

struct ElapsedFmt(time::Instant);

impl fmt::Display for ElapsedFmt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{:?}", self.0.elapsed()) }
}

/// An empty tracer.
pub struct Noop;

impl Tracer for Noop {
    type TickContext = ();
    fn start_tick(&self) {}
    fn end_tick(&self, _: (), _: &TickStats) {}

    type RunSystemContext = ();
    fn start_run_system(&self, _: &str) {}
    fn end_run_system(&self, _: (), _: &str, _: bool) {}

    fn skip_system(&self, _: &str) {}

    fn commit_destruction(&self, _: usize) {}

    fn commit_creation(&self, _: usize) {}
}

/// A tracer that logs all events.
pub struct Log(
    /// The log level to log events with.
    pub log::Level,
);

impl Tracer for Log {
    type TickContext = time::Instant;
    fn start_tick(&self) -> time::Instant {
        log::log!(self.0, "start_tick()");
        time::Instant::now()
    }
    fn end_tick(&self, context: time::Instant, stats: &TickStats) {
        log::log!(self.0, "end_tick({}, {:?})", ElapsedFmt(context), stats);
    }

    type RunSystemContext = time::Instant;
    fn start_run_system(&self, name: &str) -> time::Instant {
        log::log!(self.0, "start_run_system({name})");
        time::Instant::now()
    }
    fn end_run_system(&self, context: time::Instant, name: &str, ok: bool) {
        log::log!(self.0, "end_run_system({}, {name}, ok = {ok})", ElapsedFmt(context));
    }

    fn skip_system(&self, name: &str) { log::log!(self.0, "skip_system({name})"); }

    fn commit_destruction(&self, count: usize) { log::log!(self.0, "commit_destruction({count})"); }

    fn commit_creation(&self, count: usize) { log::log!(self.0, "commit_creation({count})"); }
}

/// Groups multiple tracers into a tuple and dispatches each call to them in serial.
pub struct Aggregate<T>(
    /// A tuple of child tracers to execute in serial.
    pub T,
);

macro_rules! impl_aggregate {
    ($($index:tt: $ty:ident),*) => {
        impl<$($ty: Tracer),*> Tracer for Aggregate<($($ty,)*)> {
            type TickContext = ($($ty::TickContext,)*);
            fn start_tick(&self) -> Self::TickContext { ($(self.0.$index.start_tick(),)*) }
            fn end_tick(&self, context: Self::TickContext, stats: &TickStats) {
                $(self.0.$index.end_tick(context.$index, stats);)*
            }

            type RunSystemContext = ($($ty::RunSystemContext,)*);
            fn start_run_system(&self, name: &str) -> Self::RunSystemContext {
                ($(self.0.$index.start_run_system(name),)*)
            }
            fn end_run_system(&self, context: Self::RunSystemContext, name: &str, ok: bool) {
                $(self.0.$index.end_run_system(context.$index, name, ok);)*
            }

            fn skip_system(&self, name: &str) { $(self.0.$index.skip_system(name);)* }

            fn commit_destruction(&self, count: usize) {
                $(self.0.$index.commit_destruction(count);)*
            }

            fn commit_creation(&self, count: usize) { $(self.0.$index.commit_creation(count);)* }
        }
    }
}

impl_aggregate!(0: A, 1: B);
impl_aggregate!(0: A, 1: B, 2: C);
impl_aggregate!(0: A, 1: B, 2: C, 3: D);
