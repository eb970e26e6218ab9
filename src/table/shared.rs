//! Name-keyed tables for records that are not attached to entities.

use std::sync::Arc;

use indexmap::IndexMap;

use super::Record;
use crate::handle::Handles;
use crate::lock::{Lockable, RawTableLock, TableLock};

/// A table of records keyed by name, in insertion order.
pub struct SharedTable<R: Record> {
    records: TableLock<IndexMap<Box<str>, R>>,
    handles: Option<Arc<Handles>>,
}

impl<R: Record> Default for SharedTable<R> {
    fn default() -> Self { Self::new() }
}

impl<R: Record> SharedTable<R> {
    /// Creates an empty shared table.
    pub fn new() -> Self { Self::with_lock(RawTableLock::new(R::NAME), None) }

    /// Creates an empty shared table with a preconfigured lock.
    ///
    /// If `handles` is given, handles owned by destroyed records are released in it.
    pub fn with_lock(lock: RawTableLock, handles: Option<Arc<Handles>>) -> Self {
        Self { records: TableLock::with_raw(lock, IndexMap::new()), handles }
    }

    /// The name of this table.
    pub fn name(&self) -> &'static str { R::NAME }

    /// Stores the record named `name`, replacing and returning the current record if any.
    pub fn populate(&self, name: &str, value: R) -> Option<R> {
        let mut records = self.records.lock();
        match records.get_mut(name) {
            Some(existing) => Some(std::mem::replace(existing, value)),
            None => {
                records.insert(name.into(), value);
                None
            }
        }
    }

    /// Clones the record named `name`.
    pub fn record(&self, name: &str) -> Option<R>
    where
        R: Clone,
    {
        self.records.lock().get(name).cloned()
    }

    /// Calls `f` with the record named `name` under the table lock.
    pub fn with_record<T>(&self, name: &str, f: impl FnOnce(&R) -> T) -> Option<T> {
        self.records.lock().get(name).map(f)
    }

    /// Calls `f` with the mutable record named `name` under the table lock.
    pub fn with_record_mut<T>(&self, name: &str, f: impl FnOnce(&mut R) -> T) -> Option<T> {
        self.records.lock().get_mut(name).map(f)
    }

    /// Whether a record named `name` exists.
    pub fn has_record(&self, name: &str) -> bool { self.records.lock().contains_key(name) }

    /// Removes and returns the record named `name`, preserving the order of the others.
    ///
    /// Handles owned by the record are released.
    pub fn destroy_record(&self, name: &str) -> Option<R> {
        let record = self.records.lock().shift_remove(name)?;

        if let Some(handles) = &self.handles {
            record.visit_handles(&mut |id| {
                if let Err(err) = handles.release_handle(id) {
                    log::warn!("Cannot release {id:?} owned by {name:?} in {}: {err}", R::NAME);
                }
            });
        }

        Some(record)
    }

    /// The names of all records in insertion order.
    pub fn names(&self) -> Vec<Box<str>> { self.records.lock().keys().cloned().collect() }

    /// The number of records.
    pub fn len(&self) -> usize { self.records.lock().len() }

    /// Whether the table has no records.
    pub fn is_empty(&self) -> bool { self.records.lock().is_empty() }
}

impl<R: Record> Lockable for SharedTable<R> {
    fn table_lock(&self) -> &RawTableLock { self.records.table_lock() }
}
