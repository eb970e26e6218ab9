//! Interfaces to the host environment.

use std::time::{Duration, Instant};

/// A monotonic clock stamping entity creation.
pub trait WorldClock: Send + Sync {
    /// The time elapsed since the world started.
    fn now(&self) -> Duration;
}

/// A [`WorldClock`] backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct InstantClock {
    start: Instant,
}

impl Default for InstantClock {
    fn default() -> Self { Self { start: Instant::now() } }
}

impl WorldClock for InstantClock {
    fn now(&self) -> Duration { self.start.elapsed() }
}

/// Receives power mode hints.
///
/// When configured, turbo mode is turned off when all systems are paused
/// and turned back on when they are resumed.
pub trait PowerHint: Send + Sync {
    /// Requests turbo mode on or off.
    fn set_turbo(&self, on: bool);
}

/// A [`PowerHint`] that ignores all hints.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPowerHint;

impl PowerHint for NoPowerHint {
    fn set_turbo(&self, on: bool) { log::trace!("Ignoring turbo hint {on}") }
}
