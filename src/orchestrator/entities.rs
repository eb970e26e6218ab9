use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use super::{ArchetypeId, Orchestrator};
use crate::error::{Error, Result};
use crate::jar::Jar;
use crate::table::Entity;

/// The bookkeeping record of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityInfo {
    /// The archetype the entity was created with.
    pub archetype:  ArchetypeId,
    /// The world clock reading when the entity was created.
    pub created_at: Duration,
    /// Whether the entity is queued for destruction.
    pub destroyed:  bool,
}

/// Initializes the records of a newly created entity.
pub type Init = Box<dyn FnOnce(&Orchestrator, Entity) -> Result<()> + Send>;

pub(crate) struct PendingCreation {
    pub(crate) archetype: ArchetypeId,
    pub(crate) init:      Init,
}

impl fmt::Debug for PendingCreation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PendingCreation").field("archetype", &self.archetype).finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingDestruction {
    pub(crate) entity: Entity,
    pub(crate) notify: bool,
}

/// Mints entity ids and queues asynchronous creations and destructions.
#[derive(Debug, Default)]
pub(crate) struct EntityRegistry {
    jar:          Jar<EntityInfo>,
    creations:    VecDeque<PendingCreation>,
    destructions: VecDeque<PendingDestruction>,
}

impl EntityRegistry {
    /// Mints an entity id and stores its bookkeeping record.
    pub(crate) fn mint(&mut self, info: EntityInfo) -> Result<Entity> {
        let cookie = self.jar.insert(info).map_err(|err| match err {
            Error::CookiesExhausted { issued } => Error::EntityIdsExhausted { issued },
            err => err,
        })?;
        Ok(Entity::from_cookie(cookie))
    }

    /// Frees the id of an entity.
    pub(crate) fn free(&mut self, entity: Entity) -> Result<EntityInfo> {
        self.jar
            .take(entity.cookie())
            .map_err(|_| Error::EntityRecordNotFound { entity, table: "entities" })
    }

    pub(crate) fn info(&self, entity: Entity) -> Option<EntityInfo> {
        self.jar.get(entity.cookie()).copied()
    }

    pub(crate) fn contains(&self, entity: Entity) -> bool { self.jar.contains(entity.cookie()) }

    pub(crate) fn len(&self) -> usize { self.jar.len() }

    /// Marks an entity as destroyed and queues it.
    ///
    /// Returns `false` if the entity was already marked.
    pub(crate) fn queue_destruction(&mut self, entity: Entity, notify: bool) -> Result<bool> {
        let info = self
            .jar
            .get_mut(entity.cookie())
            .ok_or(Error::EntityRecordNotFound { entity, table: "entities" })?;
        if info.destroyed {
            return Ok(false);
        }
        info.destroyed = true;
        self.destructions.push_back(PendingDestruction { entity, notify });
        Ok(true)
    }

    pub(crate) fn queue_creation(&mut self, creation: PendingCreation) {
        self.creations.push_back(creation);
    }

    pub(crate) fn pop_destruction(&mut self) -> Option<PendingDestruction> {
        self.destructions.pop_front()
    }

    pub(crate) fn requeue_destruction(&mut self, pending: PendingDestruction) {
        self.destructions.push_front(pending);
    }

    pub(crate) fn pop_creation(&mut self) -> Option<PendingCreation> {
        self.creations.pop_front()
    }

    pub(crate) fn queued(&self) -> (usize, usize) {
        (self.destructions.len(), self.creations.len())
    }
}
