use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::table::Record;
use crate::util::DbgTypeId;

/// Identifies an archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchetypeId(pub u32);

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "#{}", self.0) }
}

type MakeDefault = dyn Fn() -> Box<dyn Any + Send> + Send + Sync;

/// A default record populated into its table when an entity of the archetype is created.
pub(crate) struct DefaultRecord {
    pub(crate) table: DbgTypeId,
    pub(crate) make:  Arc<MakeDefault>,
}

/// A kind of entity, listing the records every new entity of the kind starts with.
pub struct Archetype {
    id:       ArchetypeId,
    name:     String,
    defaults: Vec<DefaultRecord>,
}

impl Archetype {
    /// Creates an archetype without default records.
    pub fn new(id: ArchetypeId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), defaults: Vec::new() }
    }

    /// Adds a default record cloned into the table of `R` for every new entity.
    ///
    /// The table of `R` must be registered before an entity of this archetype is created.
    /// A later default for the same record type replaces the earlier one.
    pub fn with_default<R: Record + Clone>(mut self, value: R) -> Self {
        let table = DbgTypeId::of::<R>();
        self.defaults.retain(|default| default.table != table);
        self.defaults.push(DefaultRecord {
            table,
            make: Arc::new(move || Box::new(value.clone()) as Box<dyn Any + Send>),
        });
        self
    }

    /// The id of the archetype.
    pub fn id(&self) -> ArchetypeId { self.id }

    /// The name of the archetype.
    pub fn name(&self) -> &str { &self.name }

    /// The record types that new entities of this archetype start with.
    pub fn default_tables(&self) -> impl Iterator<Item = DbgTypeId> + '_ {
        self.defaults.iter().map(|default| default.table)
    }

    pub(crate) fn defaults(&self) -> &[DefaultRecord] { &self.defaults }
}

impl fmt::Debug for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Archetype")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("defaults", &self.default_tables().collect::<Vec<_>>())
            .finish()
    }
}
