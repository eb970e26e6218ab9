use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{RwLock, RwLockReadGuard};

use super::Entity;
use crate::error::Result;
use crate::jar::Slots;

/// The frozen copy of a table.
pub(super) struct Snapshot<R> {
    slots: RwLock<Slots<Entity, R>>,
    users: AtomicUsize,
}

impl<R> Default for Snapshot<R> {
    fn default() -> Self {
        Self { slots: RwLock::new(Slots::default()), users: AtomicUsize::new(0) }
    }
}

impl<R> Snapshot<R> {
    pub(super) fn users(&self) -> usize { self.users.load(Ordering::Acquire) }

    pub(super) fn replace(&self, slots: Slots<Entity, R>) { *self.slots.write() = slots; }

    pub(super) fn remove(&self, entity: Entity) -> Result<R> {
        let (_, record) = self.slots.write().remove(entity)?;
        Ok(record)
    }
}

/// Shared access to the snapshot of a table.
///
/// The snapshot cannot be replaced while any guard exists.
/// Records destroyed in the table are removed from the snapshot in step,
/// so it never shows an entity that no longer has a record.
/// Records created or updated after the snapshot was taken are not visible.
///
/// Do not hold the result of [`read`](Self::read)
/// while destroying records of the same table on the same thread.
pub struct SnapshotGuard<'t, R> {
    snapshot: &'t Snapshot<R>,
}

impl<'t, R> SnapshotGuard<'t, R> {
    pub(super) fn new(snapshot: &'t Snapshot<R>) -> Self {
        snapshot.users.fetch_add(1, Ordering::AcqRel);
        Self { snapshot }
    }

    /// The number of records in the snapshot.
    pub fn len(&self) -> usize { self.snapshot.slots.read().len() }

    /// Whether the snapshot has no records.
    pub fn is_empty(&self) -> bool { self.snapshot.slots.read().is_empty() }

    /// Whether the snapshot contains a record of `entity`.
    pub fn contains(&self, entity: Entity) -> bool { self.snapshot.slots.read().contains(entity) }

    /// Clones the record of `entity` from the snapshot.
    pub fn get(&self, entity: Entity) -> Option<R>
    where
        R: Clone,
    {
        self.snapshot.slots.read().get(entity).cloned()
    }

    /// Calls `f` with every record of the snapshot in slot order.
    pub fn for_each(&self, mut f: impl FnMut(Entity, &R)) {
        for (entity, record) in self.snapshot.slots.read().iter() {
            f(entity, record);
        }
    }

    /// Read-locks the snapshot storage.
    pub fn read(&self) -> RwLockReadGuard<'_, Slots<Entity, R>> { self.snapshot.slots.read() }
}

impl<'t, R> Drop for SnapshotGuard<'t, R> {
    fn drop(&mut self) { self.snapshot.users.fetch_sub(1, Ordering::AcqRel); }
}
