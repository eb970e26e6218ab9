//! Handles map external resource ids to shared references.
//!
//! Handle ids live in their own id space,
//! minted and recycled with the same discipline as entity ids.
//! Records refer to resources by [`HandleId`];
//! fields tagged `#[record(handle)]` are released when the record is destroyed.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::jar::{Cookie, Generation, Jar, Key};
use crate::trigger::{Trigger, Triggers};


/// The id of a handle.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HandleId(Cookie<u32>);

impl HandleId {
    /// A handle id that never resolves.
    pub const INVALID: Self = Self(Cookie::INVALID);

    /// The raw index of this id.
    pub fn index(self) -> u32 { self.0.index() }

    /// The generation of this id.
    pub fn generation(self) -> Generation { self.0.generation() }
}

impl Key for HandleId {
    fn index(self) -> usize { Key::index(self.0) }

    fn generation(self) -> Generation { self.0.generation() }
}

impl fmt::Debug for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HandleId({}v{})", self.0.index(), self.0.generation())
    }
}

/// Distinguishes categories of external resources.
///
/// Lookups name the kind they expect,
/// so that a handle of one kind is never mistaken for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleKind(pub u32);

/// The shared reference a handle resolves to.
pub type Target = Arc<dyn Any + Send + Sync>;

struct HandleEntry {
    kind:   HandleKind,
    target: Target,
}

/// The handle table.
pub struct Handles {
    jar:      Mutex<Jar<HandleEntry>>,
    triggers: Arc<Triggers>,
}

impl Handles {
    /// Creates an empty handle table firing [`Trigger::HandleUpdated`] through `triggers`.
    pub fn new(triggers: Arc<Triggers>) -> Self { Self { jar: Mutex::new(Jar::new()), triggers } }

    /// Registers a resource and returns its new id.
    ///
    /// # Errors
    /// Returns [`Error::HandleIdsExhausted`] if no more ids can be issued.
    pub fn add_handle(&self, kind: HandleKind, target: Target) -> Result<HandleId> {
        let cookie =
            self.jar.lock().insert(HandleEntry { kind, target }).map_err(|err| match err {
                Error::CookiesExhausted { issued } => Error::HandleIdsExhausted { issued },
                err => err,
            })?;

        let id = HandleId(cookie);
        log::trace!("Added {id:?} of {kind:?}");
        Ok(id)
    }

    /// Replaces the target of a handle and returns the previous target.
    ///
    /// Fires [`Trigger::HandleUpdated`] after the table is unlocked.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHandleId`] if `id` is not live or is not of `kind`.
    pub fn update_handle(&self, id: HandleId, kind: HandleKind, target: Target) -> Result<Target> {
        let previous = {
            let mut jar = self.jar.lock();
            let entry = jar
                .get_mut(id.0)
                .filter(|entry| entry.kind == kind)
                .ok_or_else(|| Error::invalid_handle(id))?;
            std::mem::replace(&mut entry.target, target)
        };

        self.triggers.fire(Trigger::HandleUpdated(id));
        Ok(previous)
    }

    /// Unregisters a handle and returns its target.
    ///
    /// The id is recycled; later lookups with it fail.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHandleId`] if `id` is not live.
    pub fn release_handle(&self, id: HandleId) -> Result<Target> {
        let entry = self.jar.lock().take(id.0).map_err(|_| Error::invalid_handle(id))?;
        log::trace!("Released {id:?}");
        Ok(entry.target)
    }

    /// Resolves a handle of `kind`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHandleId`] if `id` is not live or is not of `kind`.
    pub fn to_handle(&self, id: HandleId, kind: HandleKind) -> Result<Target> {
        let jar = self.jar.lock();
        match jar.get(id.0) {
            Some(entry) if entry.kind == kind => Ok(Arc::clone(&entry.target)),
            _ => Err(Error::invalid_handle(id)),
        }
    }

    /// Resolves a handle of `kind` and downcasts its target.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHandleId`] if `id` is not live, is not of `kind`,
    /// or its target is not a `T`.
    pub fn to_handle_as<T: Any + Send + Sync>(
        &self,
        id: HandleId,
        kind: HandleKind,
    ) -> Result<Arc<T>> {
        self.to_handle(id, kind)?.downcast::<T>().map_err(|_| Error::invalid_handle(id))
    }

    /// The kind of a live handle.
    pub fn kind_of(&self, id: HandleId) -> Option<HandleKind> {
        self.jar.lock().get(id.0).map(|entry| entry.kind)
    }

    /// Whether `id` is live.
    pub fn contains(&self, id: HandleId) -> bool { self.jar.lock().contains(id.0) }

    /// The number of live handles.
    pub fn len(&self) -> usize { self.jar.lock().len() }

    /// Whether there are no live handles.
    pub fn is_empty(&self) -> bool { self.jar.lock().is_empty() }
}

/// Values that may contain handle ids owned by a record.
///
/// Implemented for the field types supported by `#[record(handle)]`.
pub trait HandleRefs {
    /// Calls `visitor` with each handle id in this value.
    fn visit_handle_refs(&self, visitor: &mut dyn FnMut(HandleId));
}

impl HandleRefs for HandleId {
    fn visit_handle_refs(&self, visitor: &mut dyn FnMut(HandleId)) { visitor(*self) }
}

impl<T: HandleRefs> HandleRefs for Option<T> {
    fn visit_handle_refs(&self, visitor: &mut dyn FnMut(HandleId)) {
        if let Some(value) = self {
            value.visit_handle_refs(visitor);
        }
    }
}

impl<T: HandleRefs> HandleRefs for Vec<T> {
    fn visit_handle_refs(&self, visitor: &mut dyn FnMut(HandleId)) {
        for value in self {
            value.visit_handle_refs(visitor);
        }
    }
}

impl<T: HandleRefs, const N: usize> HandleRefs for [T; N] {
    fn visit_handle_refs(&self, visitor: &mut dyn FnMut(HandleId)) {
        for value in self {
            value.visit_handle_refs(visitor);
        }
    }
}
