use std::any::{self, Any};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::Orchestrator;
use crate::error::Result;
use crate::util::DbgTypeId;

/// A unit of logic run by every tick of the orchestrator.
///
/// A system is instantiated once from its registered factory
/// and shared between ticks, so state mutated by [`apply`](Self::apply)
/// needs interior mutability.
/// Systems of the same tick may run concurrently on different worker threads.
pub trait System: Send + Sync + 'static {
    /// The name used in logs and tracers.
    fn name(&self) -> &'static str { any::type_name::<Self>() }

    /// Whether the system should run in the current tick.
    fn is_ready(&self, _orchestrator: &Orchestrator) -> bool { true }

    /// Runs the system once.
    ///
    /// Entities should be created and destroyed through the asynchronous queues
    /// so that other systems iterating in the same tick are not disturbed.
    fn apply(&self, orchestrator: &Orchestrator) -> Result<()>;

    /// Called when the global pause flag of this system changes.
    fn on_paused(&self, _paused: bool) {}

    /// The system that runs this system, if any.
    ///
    /// Subordinate systems are skipped by the tick.
    /// The parent runs them explicitly through [`Orchestrator::run_system`].
    fn parent(&self) -> Option<DbgTypeId> { None }
}

/// An instantiated system.
pub(crate) struct SystemEntry {
    pub(crate) name:     &'static str,
    pub(crate) instance: Arc<dyn Any + Send + Sync>,
    pub(crate) system:   Arc<dyn System>,
    paused:              AtomicBool,
}

impl SystemEntry {
    pub(crate) fn new<S: System>(system: Arc<S>) -> Self {
        Self {
            name:     system.name(),
            instance: Arc::clone(&system) as Arc<dyn Any + Send + Sync>,
            system:   system as Arc<dyn System>,
            paused:   AtomicBool::new(false),
        }
    }

    pub(crate) fn is_paused(&self) -> bool { self.paused.load(Ordering::Acquire) }

    /// Sets the pause flag, notifying the system if it changed.
    pub(crate) fn set_paused(&self, paused: bool) {
        if self.paused.swap(paused, Ordering::AcqRel) != paused {
            self.system.on_paused(paused);
        }
    }
}

impl fmt::Debug for SystemEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SystemEntry")
            .field("name", &self.name)
            .field("paused", &self.is_paused())
            .finish_non_exhaustive()
    }
}
