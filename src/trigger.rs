//! Synchronous notifications of orchestrator events.
//!
//! Observers run on the thread that caused the event,
//! before the operation that fired it returns.
//! An observer must not block on locks the firing thread may hold;
//! entity triggers are fired outside the entity registry and table locks.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::handle::HandleId;
use crate::table::Entity;

/// An event observable through [`Triggers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// An entity was created.
    EntityCreated(Entity),
    /// An entity is about to be destroyed.
    EntityDestroyed(Entity),
    /// All systems were paused.
    SystemsPaused,
    /// All systems were resumed.
    SystemsResumed,
    /// The target of a handle was replaced.
    HandleUpdated(HandleId),
}

/// Receives [`Trigger`]s.
pub trait Observer: Send + Sync {
    /// Called on the thread that fired the trigger.
    fn on_trigger(&self, trigger: Trigger);
}

impl<F: Fn(Trigger) + Send + Sync> Observer for F {
    fn on_trigger(&self, trigger: Trigger) { self(trigger) }
}

/// The list of subscribed observers.
#[derive(Default)]
pub struct Triggers {
    observers: RwLock<Vec<Arc<dyn Observer>>>,
}

impl Triggers {
    /// Subscribes an observer to all future triggers.
    pub fn subscribe(&self, observer: Arc<dyn Observer>) { self.observers.write().push(observer); }

    /// Delivers `trigger` to every observer in subscription order.
    pub fn fire(&self, trigger: Trigger) {
        log::trace!("Fire {trigger:?}");

        // observers may subscribe more observers
        let observers = self.observers.read().clone();
        for observer in observers {
            observer.on_trigger(trigger);
        }
    }

    /// The number of subscribed observers.
    pub fn len(&self) -> usize { self.observers.read().len() }

    /// Whether no observer is subscribed.
    pub fn is_empty(&self) -> bool { self.observers.read().is_empty() }
}
