//! Component tables store one record per entity.
//!
//! A [`Table`] is a [`Slots`] storage keyed by [`Entity`],
//! guarded by its own [`TableLock`].
//! Records are densely packed and can be sorted in place;
//! entity lookups stay valid across removals and sorting.
//!
//! Readers that do not want to hold the table lock
//! can use a [snapshot](Table::scoped_snapshot) instead.

use std::any::Any;
use std::sync::Arc;
use std::{cmp, fmt, ops};

use crate::error::{Error, Result};
use crate::handle::{HandleId, Handles};
use crate::jar::{Cookie, Generation, Key, Slots};
use crate::lock::{Lockable, RawTableLock, TableGuard, TableLock};
use crate::pool::WorkerPool;

mod snapshot;
pub use snapshot::SnapshotGuard;
use snapshot::Snapshot;

pub mod shared;
pub use shared::SharedTable;

#[cfg(test)]
mod tests;

/// Describes one field of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// The field name, or its position for tuple structs.
    pub name: &'static str,
    /// The type of the field as written in the source.
    pub ty:   &'static str,
    /// The size of the field in bytes.
    pub size: usize,
}

/// A record type stored in a [`Table`].
///
/// This trait is usually implemented with `#[derive(Record)]`.
pub trait Record: Send + Sync + Sized + 'static {
    /// The name of the table storing this record type.
    const NAME: &'static str;

    /// The field schema of this record type.
    const FIELDS: &'static [Field];

    /// Calls `visitor` with every handle owned by this record.
    ///
    /// Owned handles are released when the record is destroyed.
    fn visit_handles(&self, _visitor: &mut dyn FnMut(HandleId)) {}
}

/// Identifies an entity.
///
/// An entity id is generational:
/// after the entity is destroyed and its index reused,
/// the old id no longer resolves to the new entity's records.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Entity(Cookie<u32>);

static_assertions::assert_eq_size!(Entity, u64);
static_assertions::assert_impl_all!(Entity: Send, Sync, Copy);

impl Entity {
    /// An entity id that never resolves.
    pub const INVALID: Self = Self(Cookie::INVALID);

    pub(crate) fn from_cookie(cookie: Cookie<u32>) -> Self { Self(cookie) }

    pub(crate) fn cookie(self) -> Cookie<u32> { self.0 }

    /// The raw index of this entity.
    pub fn index(self) -> u32 { self.0.index() }

    /// The generation of this entity id.
    pub fn generation(self) -> Generation { self.0.generation() }

    /// Whether this is the [`INVALID`](Self::INVALID) sentinel.
    pub fn is_invalid(self) -> bool { self.0.is_invalid() }
}

impl Key for Entity {
    fn index(self) -> usize { Key::index(self.0) }

    fn generation(self) -> Generation { self.0.generation() }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "Entity(INVALID)")
        } else {
            write!(f, "Entity({}v{})", self.0.index(), self.0.generation())
        }
    }
}

/// The lock-guarded contents of a [`Table`].
pub struct Records<R> {
    slots:         Slots<Entity, R>,
    have_snapshot: bool,
}

impl<R> ops::Deref for Records<R> {
    type Target = Slots<Entity, R>;

    fn deref(&self) -> &Slots<Entity, R> { &self.slots }
}

impl<R> Records<R> {
    /// Gets a mutable reference to the record of `entity`.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut R> { self.slots.get_mut(entity) }

    /// Iterates over `(entity, record)` pairs in slot order with mutable records.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut R)> + '_ {
        self.slots.iter_mut()
    }
}

/// A component table.
pub struct Table<R: Record> {
    records:  TableLock<Records<R>>,
    snapshot: Snapshot<R>,
    handles:  Option<Arc<Handles>>,
}

impl<R: Record> Default for Table<R> {
    fn default() -> Self { Self::new() }
}

impl<R: Record> Table<R> {
    /// Creates an empty standalone table.
    pub fn new() -> Self { Self::with_lock(RawTableLock::new(R::NAME), None) }

    /// Creates an empty table with a preconfigured lock.
    ///
    /// If `handles` is given, handles owned by destroyed records are released in it.
    pub fn with_lock(lock: RawTableLock, handles: Option<Arc<Handles>>) -> Self {
        Self {
            records: TableLock::with_raw(
                lock,
                Records { slots: Slots::default(), have_snapshot: false },
            ),
            snapshot: Snapshot::default(),
            handles,
        }
    }

    /// The name of this table.
    pub fn name(&self) -> &'static str { R::NAME }

    /// Locks the table for direct access to its records.
    ///
    /// Records cannot be added or removed through the guard.
    pub fn lock(&self) -> TableGuard<'_, Records<R>> { self.records.lock() }

    /// Stores the record of `entity`, replacing and returning its current record if any.
    ///
    /// A record left behind by an earlier entity with the same index is destroyed first.
    ///
    /// # Errors
    /// Returns [`Error::CookieInvalid`] if `entity` is [`Entity::INVALID`],
    /// or if a later entity with the same index owns a record.
    /// The table is unchanged in both cases.
    pub fn populate(&self, entity: Entity, value: R) -> Result<Option<R>> {
        if entity.is_invalid() {
            return Err(Error::cookie_invalid(entity));
        }

        let mut records = self.records.lock();

        if let Some(existing) = records.slots.get_mut(entity) {
            return Ok(Some(std::mem::replace(existing, value)));
        }

        if let Some(stale) = records.slots.occupant(entity) {
            if !entity.generation().is_newer_than(stale.generation()) {
                log::debug!("Rejecting stale {entity:?} in {}, owned by {stale:?}", R::NAME);
                return Err(Error::cookie_invalid(entity));
            }
            log::debug!("Evicting stale record of {stale:?} from {} for {entity:?}", R::NAME);
            self.remove_locked(&mut records, stale)?;
        }

        records.slots.add(entity, value)?;
        Ok(None)
    }

    /// Clones the record of `entity`.
    pub fn entity_record(&self, entity: Entity) -> Option<R>
    where
        R: Clone,
    {
        self.records.lock().slots.get(entity).cloned()
    }

    /// Calls `f` with the record of `entity` under the table lock.
    pub fn with_entity_record<T>(&self, entity: Entity, f: impl FnOnce(&R) -> T) -> Option<T> {
        self.records.lock().slots.get(entity).map(f)
    }

    /// Calls `f` with the mutable record of `entity` under the table lock.
    pub fn with_entity_record_mut<T>(
        &self,
        entity: Entity,
        f: impl FnOnce(&mut R) -> T,
    ) -> Option<T> {
        self.records.lock().slots.get_mut(entity).map(f)
    }

    /// Whether `entity` has a record in this table.
    pub fn has_entity_record(&self, entity: Entity) -> bool {
        self.records.lock().slots.contains(entity)
    }

    /// Removes and returns the record of `entity`.
    ///
    /// Handles owned by the record are released first.
    /// If the table has a snapshot, the removal is mirrored into it.
    ///
    /// # Errors
    /// Returns [`Error::EntityRecordNotFound`] if `entity` has no record.
    pub fn destroy_entity_record(&self, entity: Entity) -> Result<R> {
        let mut records = self.records.lock();
        if !records.slots.contains(entity) {
            return Err(Error::EntityRecordNotFound { entity, table: R::NAME });
        }
        self.remove_locked(&mut records, entity)
    }

    fn remove_locked(&self, records: &mut Records<R>, entity: Entity) -> Result<R> {
        if let (Some(handles), Some(record)) = (&self.handles, records.slots.get(entity)) {
            record.visit_handles(&mut |id| {
                if let Err(err) = handles.release_handle(id) {
                    log::warn!("Cannot release {id:?} owned by {entity:?} in {}: {err}", R::NAME);
                }
            });
        }

        let (_, record) = records.slots.remove(entity)?;

        if records.have_snapshot {
            // the snapshot may not contain the entity if it was populated after the snapshot
            let _ = self.snapshot.remove(entity);
        }

        Ok(record)
    }

    /// The number of records.
    pub fn len(&self) -> usize { self.records.lock().slots.len() }

    /// Whether the table has no records.
    pub fn is_empty(&self) -> bool { self.records.lock().slots.is_empty() }

    /// The entities with a record, in slot order.
    pub fn entities(&self) -> Vec<Entity> { self.records.lock().slots.keys().to_vec() }

    /// Calls `f` with every record in slot order under the table lock.
    pub fn for_each(&self, mut f: impl FnMut(Entity, &R)) {
        for (entity, record) in self.records.lock().slots.iter() {
            f(entity, record);
        }
    }

    /// Calls `f` with every mutable record in slot order under the table lock.
    pub fn for_each_mut(&self, mut f: impl FnMut(Entity, &mut R)) {
        for (entity, record) in self.records.lock().slots.iter_mut() {
            f(entity, record);
        }
    }

    /// Calls `f` with every record on the worker pool.
    ///
    /// The table lock is held by the calling thread until all calls complete.
    /// Runs on the calling thread if there are at most `min_len` records.
    pub fn par_for_each(
        &self,
        pool: &dyn WorkerPool,
        min_len: usize,
        f: impl Fn(Entity, &R) + Sync,
    ) {
        let records = self.records.lock();
        let slots = &records.slots;

        pool.for_each_range(slots.len(), min_len, &|range| {
            for slot in range {
                let entity = slots.key_at(slot).expect("range is within the table");
                let record = &slots.values()[slot];
                f(entity, record);
            }
        });
    }

    /// Sorts the records in place.
    ///
    /// Entity lookups remain valid.
    pub fn sort_by(&self, compare: impl FnMut(&R, &R) -> cmp::Ordering) {
        self.records.lock().slots.sort_by(compare);
    }

    /// Whether a snapshot has been taken.
    pub fn has_snapshot(&self) -> bool { self.records.lock().have_snapshot }

    /// The number of outstanding snapshot guards.
    pub fn snapshot_users(&self) -> usize { self.snapshot.users() }
}

impl<R: Record + Clone> Table<R> {
    /// Replaces the snapshot with a copy of the current records.
    ///
    /// Does nothing and returns `false` while a [`SnapshotGuard`] is outstanding,
    /// so a guarded snapshot only ever shrinks.
    pub fn take_snapshot(&self) -> bool {
        let mut records = self.records.lock();
        if self.snapshot.users() > 0 {
            log::trace!("Snapshot of {} is in use, not replacing", R::NAME);
            return false;
        }

        self.snapshot.replace(records.slots.clone());
        records.have_snapshot = true;
        true
    }

    /// Borrows the snapshot without holding the table lock.
    ///
    /// The snapshot is empty if none was taken.
    /// While the guard lives, the snapshot is not replaced,
    /// but records destroyed in the table are also removed from the snapshot.
    pub fn scoped_snapshot(&self) -> SnapshotGuard<'_, R> {
        // registered under the table lock so that it cannot race with `take_snapshot`
        let lock = self.table_lock();
        lock.lock();
        let guard = SnapshotGuard::new(&self.snapshot);
        lock.unlock();
        guard
    }
}

impl<R: Record> Lockable for Table<R> {
    fn table_lock(&self) -> &RawTableLock { self.records.table_lock() }
}

impl<R: Record> fmt::Debug for Table<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Table").field("name", &R::NAME).finish_non_exhaustive()
    }
}

/// A table of unknown record type.
pub trait AnyTable: Lockable + Send + Sync + 'static {
    /// The name of the table.
    fn name(&self) -> &'static str;

    /// The field schema of the record type.
    fn fields(&self) -> &'static [Field];

    /// The number of records.
    fn len(&self) -> usize;

    /// Whether the table has no records.
    fn is_empty(&self) -> bool { self.len() == 0 }

    /// Whether `entity` has a record.
    fn has_entity_record(&self, entity: Entity) -> bool;

    /// Removes the record of `entity`.
    ///
    /// # Errors
    /// Returns [`Error::EntityRecordNotFound`] if `entity` has no record.
    fn destroy_entity_record(&self, entity: Entity) -> Result<()>;

    /// Stores a type-erased record.
    ///
    /// # Errors
    /// Returns [`Error::InvalidData`] if `value` is missing or not of the record type.
    fn populate_erased(&self, entity: Entity, value: Option<Box<dyn Any + Send>>) -> Result<()>;

    /// Converts to `Arc<dyn Any>` for downcasting to the concrete table type.
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<R: Record> AnyTable for Table<R> {
    fn name(&self) -> &'static str { R::NAME }

    fn fields(&self) -> &'static [Field] { R::FIELDS }

    fn len(&self) -> usize { Table::len(self) }

    fn has_entity_record(&self, entity: Entity) -> bool { Table::has_entity_record(self, entity) }

    fn destroy_entity_record(&self, entity: Entity) -> Result<()> {
        Table::destroy_entity_record(self, entity).map(drop)
    }

    fn populate_erased(&self, entity: Entity, value: Option<Box<dyn Any + Send>>) -> Result<()> {
        let value = value.ok_or(Error::InvalidData { table: R::NAME, reason: "missing value" })?;
        let value = value
            .downcast::<R>()
            .map_err(|_| Error::InvalidData { table: R::NAME, reason: "record type mismatch" })?;
        self.populate(entity, *value)?;
        Ok(())
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> { self }
}
