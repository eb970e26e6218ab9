//! Miscellaneous utilities.

use std::any::{self, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A [`TypeId`] that remembers the name of its type for debugging.
#[derive(Clone, Copy)]
pub struct DbgTypeId {
    id:   TypeId,
    name: &'static str,
}

impl DbgTypeId {
    /// The id of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self { id: TypeId::of::<T>(), name: any::type_name::<T>() }
    }

    /// The name of the type.
    pub fn name(&self) -> &'static str { self.name }
}

impl fmt::Debug for DbgTypeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(self.name) }
}

impl fmt::Display for DbgTypeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(self.name) }
}

impl PartialEq for DbgTypeId {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl Eq for DbgTypeId {}

impl PartialOrd for DbgTypeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for DbgTypeId {
    fn cmp(&self, other: &Self) -> Ordering { self.id.cmp(&other.id) }
}

impl Hash for DbgTypeId {
    fn hash<H: Hasher>(&self, state: &mut H) { self.id.hash(state) }
}
