//! The orchestrator owns the registries, the entity and handle id spaces,
//! the asynchronous creation and destruction queues, and drives systems every tick.
//!
//! # Locking
//! Every table has its own lock, and every registry has its own independent lock.
//! Table locks are always acquired before the entity registry lock,
//! which is a leaf lock like the registry locks.
//! Triggers are fired while no entity registry or table lock is held,
//! except for triggers fired by code running inside
//! [`with_all_tables_locked`](Orchestrator::with_all_tables_locked).
//!
//! # Tick
//! A tick runs every registered system that is neither paused nor subordinate
//! and whose readiness predicate holds,
//! then commits queued destructions, then queued creations.
//! Systems therefore observe a stable set of entities during the tick.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::handle::{HandleId, HandleKind, Handles, Target};
use crate::host::{PowerHint, WorldClock};
use crate::lock::profile::ContentionProfiler;
use crate::lock::{LockSet, Lockable, RawTableLock};
use crate::pool::WorkerPool;
use crate::registry::Registry;
use crate::table::{AnyTable, Entity, Record, SharedTable, Table};
use crate::tracer::{self, Tracer};
use crate::trigger::{Observer, Trigger, Triggers};
use crate::util::DbgTypeId;

mod archetype;
pub use archetype::{Archetype, ArchetypeId};

mod builder;
pub use builder::{Builder, Config};

mod entities;
use entities::{EntityRegistry, PendingCreation};
pub use entities::{EntityInfo, Init};

mod system;
use system::SystemEntry;
pub use system::System;

mod ticker;
pub use ticker::Ticker;


type TableFactory = dyn Fn(&Orchestrator) -> Arc<dyn AnyTable> + Send + Sync;
type SharedFactory = dyn Fn(&Orchestrator) -> Arc<dyn Any + Send + Sync> + Send + Sync;
type SystemFactory = dyn Fn(&Orchestrator) -> Result<SystemEntry> + Send + Sync;

/// Statistics of one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    /// The number of systems run, including failed ones.
    pub systems_run:     usize,
    /// The number of systems skipped because they are paused, not ready or subordinate.
    pub systems_skipped: usize,
    /// The number of systems that returned an error.
    pub systems_failed:  usize,
    /// The number of committed destructions.
    pub destroyed:       usize,
    /// The number of committed creations.
    pub created:         usize,
}

/// The entity/component store and its scheduler.
pub struct Orchestrator {
    config:   Config,
    clock:    Arc<dyn WorldClock>,
    power:    Arc<dyn PowerHint>,
    pool:     Arc<dyn WorkerPool>,
    profiler: Option<Arc<ContentionProfiler>>,
    triggers: Arc<Triggers>,
    handles:  Arc<Handles>,

    entities: Mutex<EntityRegistry>,

    archetypes:       Registry<ArchetypeId, Archetype>,
    table_factories:  Registry<DbgTypeId, TableFactory>,
    tables:           Registry<DbgTypeId, dyn AnyTable>,
    shared_factories: Registry<DbgTypeId, SharedFactory>,
    shared_tables:    Registry<DbgTypeId, dyn Any + Send + Sync>,
    system_factories: Registry<DbgTypeId, SystemFactory>,
    systems:          Registry<DbgTypeId, SystemEntry>,

    paused:     AtomicBool,
    /// Serializes pause flag transitions with system instantiation.
    pause_lock: Mutex<()>,
}

impl Default for Orchestrator {
    fn default() -> Self { Self::new() }
}

impl Orchestrator {
    /// Creates an orchestrator with the default configuration.
    pub fn new() -> Self { Self::builder().build() }

    /// Customizes a new orchestrator.
    pub fn builder() -> Builder { Builder::default() }

    pub(crate) fn from_parts(
        config: Config,
        clock: Arc<dyn WorldClock>,
        power: Arc<dyn PowerHint>,
        pool: Arc<dyn WorkerPool>,
    ) -> Self {
        let triggers = Arc::new(Triggers::default());
        let profiler =
            config.profiler.clone().map(|config| Arc::new(ContentionProfiler::new(config)));

        Self {
            clock,
            power,
            pool,
            profiler,
            handles: Arc::new(Handles::new(Arc::clone(&triggers))),
            triggers,
            entities: Mutex::new(EntityRegistry::default()),
            archetypes: Registry::new("archetype"),
            table_factories: Registry::new("component table"),
            tables: Registry::new("component table instance"),
            shared_factories: Registry::new("shared component table"),
            shared_tables: Registry::new("shared component table instance"),
            system_factories: Registry::new("system"),
            systems: Registry::new("system instance"),
            paused: AtomicBool::new(false),
            pause_lock: Mutex::new(()),
            config,
        }
    }

    /// The configuration of this orchestrator.
    pub fn config(&self) -> &Config { &self.config }

    /// The worker pool running systems.
    pub fn pool(&self) -> &dyn WorkerPool { &*self.pool }

    /// The contention profiler installed into table locks, if configured.
    pub fn contention_profiler(&self) -> Option<&Arc<ContentionProfiler>> {
        self.profiler.as_ref()
    }

    /// Subscribes an observer to all future triggers.
    pub fn subscribe(&self, observer: Arc<dyn Observer>) { self.triggers.subscribe(observer); }

    fn new_lock(&self, name: &'static str) -> RawTableLock {
        RawTableLock::with_options(name, self.config.spin_limit, self.profiler.clone())
    }
}

/// Registration and lookup.
impl Orchestrator {
    /// Registers an archetype.
    ///
    /// # Errors
    /// Returns [`Error::AlreadyExists`] if the id is already registered.
    pub fn register_archetype(&self, archetype: Archetype) -> Result<()> {
        let id = archetype.id();
        self.archetypes.insert_new(id, Arc::new(archetype))?;
        log::debug!("Registered archetype {id}");
        Ok(())
    }

    /// Gets a registered archetype.
    ///
    /// # Errors
    /// Returns [`Error::ArchetypeNotFound`] if the id is not registered.
    pub fn archetype(&self, id: ArchetypeId) -> Result<Arc<Archetype>> {
        self.archetypes.get(&id).ok_or(Error::ArchetypeNotFound { id: id.0 })
    }

    /// Registers the component table of `R`, instantiated on first access.
    ///
    /// # Errors
    /// Returns [`Error::AlreadyExists`] if the table is already registered.
    pub fn register_component<R: Record>(&self) -> Result<()> {
        let factory: Arc<TableFactory> = Arc::new(|orchestrator: &Orchestrator| {
            let lock = orchestrator.new_lock(R::NAME);
            let handles = Some(Arc::clone(&orchestrator.handles));
            Arc::new(Table::<R>::with_lock(lock, handles)) as Arc<dyn AnyTable>
        });
        self.table_factories.insert_new(DbgTypeId::of::<R>(), factory)
    }

    /// Gets the component table of `R`, instantiating it if necessary.
    ///
    /// # Errors
    /// Returns [`Error::ComponentNotFound`] if the table is not registered.
    pub fn component<R: Record>(&self) -> Result<Arc<Table<R>>> {
        let table = self.table_by_id(DbgTypeId::of::<R>())?;
        Ok(table
            .as_any_arc()
            .downcast::<Table<R>>()
            .expect("tables are registered under the id of their record type"))
    }

    fn table_by_id(&self, id: DbgTypeId) -> Result<Arc<dyn AnyTable>> {
        self.tables.get_or_try_init(id, || {
            let factory =
                self.table_factories.get(&id).ok_or(Error::ComponentNotFound { name: id.name() })?;
            let table = factory(self);
            log::debug!("Instantiated component table {}", table.name());
            Ok(table)
        })
    }

    /// The number of instantiated component tables.
    pub fn table_count(&self) -> usize { self.tables.len() }

    /// Registers the shared table of `R`, instantiated on first access.
    ///
    /// # Errors
    /// Returns [`Error::AlreadyExists`] if the table is already registered.
    pub fn register_shared_component<R: Record>(&self) -> Result<()> {
        let factory: Arc<SharedFactory> = Arc::new(|orchestrator: &Orchestrator| {
            let lock = orchestrator.new_lock(R::NAME);
            let handles = Some(Arc::clone(&orchestrator.handles));
            Arc::new(SharedTable::<R>::with_lock(lock, handles)) as Arc<dyn Any + Send + Sync>
        });
        self.shared_factories.insert_new(DbgTypeId::of::<R>(), factory)
    }

    /// Gets the shared table of `R`, instantiating it if necessary.
    ///
    /// # Errors
    /// Returns [`Error::ComponentNotFound`] if the table is not registered.
    pub fn shared_component<R: Record>(&self) -> Result<Arc<SharedTable<R>>> {
        let id = DbgTypeId::of::<R>();
        let table = self.shared_tables.get_or_try_init(id, || {
            let factory =
                self.shared_factories.get(&id).ok_or(Error::ComponentNotFound { name: R::NAME })?;
            log::debug!("Instantiated shared table {}", R::NAME);
            Ok::<_, Error>(factory(self))
        })?;
        Ok(table
            .downcast::<SharedTable<R>>()
            .expect("shared tables are registered under the id of their record type"))
    }

    /// Registers a system constructed with [`Default`] on first access.
    ///
    /// # Errors
    /// Returns [`Error::AlreadyExists`] if the system is already registered.
    pub fn register_system<S: System + Default>(&self) -> Result<()> {
        self.register_system_with(|_| Ok(S::default()))
    }

    /// Registers a system constructed by `factory` on first access.
    ///
    /// The factory runs without any orchestrator lock held,
    /// so it may look up tables and other systems.
    ///
    /// # Errors
    /// Returns [`Error::AlreadyExists`] if the system is already registered.
    pub fn register_system_with<S: System>(
        &self,
        factory: impl Fn(&Orchestrator) -> Result<S> + Send + Sync + 'static,
    ) -> Result<()> {
        let factory: Arc<SystemFactory> = Arc::new(move |orchestrator: &Orchestrator| {
            let system = factory(orchestrator)?;
            Ok(SystemEntry::new(Arc::new(system)))
        });
        self.system_factories.insert_new(DbgTypeId::of::<S>(), factory)
    }

    /// Gets the system `S`, instantiating it if necessary.
    ///
    /// # Errors
    /// Returns [`Error::SystemNotFound`] if the system is not registered,
    /// or the error returned by its factory.
    pub fn system<S: System>(&self) -> Result<Arc<S>> {
        let entry = self.system_entry(DbgTypeId::of::<S>())?;
        Ok(Arc::clone(&entry.instance)
            .downcast::<S>()
            .expect("systems are registered under the id of their type"))
    }

    fn system_entry(&self, id: DbgTypeId) -> Result<Arc<SystemEntry>> {
        if let Some(entry) = self.systems.get(&id) {
            return Ok(entry);
        }

        let entry = self.systems.get_or_try_init(id, || {
            let factory =
                self.system_factories.get(&id).ok_or(Error::SystemNotFound { name: id.name() })?;
            let entry = factory(self)?;
            log::debug!("Instantiated system {}", entry.name);
            Ok::<_, Error>(Arc::new(entry))
        })?;

        let _pause = self.pause_lock.lock();
        entry.set_paused(self.paused.load(Ordering::Acquire));
        Ok(entry)
    }

    /// Runs the system `S` once on the calling thread, unless it is paused.
    ///
    /// This is how a parent system runs its subordinates.
    /// Returns whether the system ran.
    ///
    /// # Errors
    /// Returns [`Error::SystemNotFound`] if the system is not registered,
    /// or the error returned by the system.
    pub fn run_system<S: System>(&self) -> Result<bool> {
        let entry = self.system_entry(DbgTypeId::of::<S>())?;
        if entry.is_paused() {
            return Ok(false);
        }
        self.run_entry(&entry, &tracer::Noop)?;
        Ok(true)
    }
}

/// Entities.
impl Orchestrator {
    fn mint_entity(&self, archetype: ArchetypeId) -> Result<Entity> {
        let info = EntityInfo { archetype, created_at: self.clock.now(), destroyed: false };
        let entity = self.entities.lock().mint(info)?;
        log::trace!("Minted {entity:?} of archetype {archetype}");
        Ok(entity)
    }

    fn populate_entity(
        &self,
        archetype: &Archetype,
        entity: Entity,
        init: impl FnOnce(&Orchestrator, Entity) -> Result<()>,
    ) -> Result<()> {
        for default in archetype.defaults() {
            let table = self.table_by_id(default.table)?;
            table.populate_erased(entity, Some((default.make)()))?;
        }
        init(self, entity)
    }

    /// Instantiates the default tables of an archetype
    /// so that they exist before the full lock set is acquired.
    fn prepare_tables(&self, archetype: &Archetype) -> Result<()> {
        for table in archetype.default_tables() {
            self.table_by_id(table)?;
        }
        Ok(())
    }

    /// Undoes a creation whose initialization failed.
    fn rollback(&self, entity: Entity) {
        if let Err(err) = self.destroy_entity(entity, false) {
            log::warn!("Cannot roll back creation of {entity:?}: {err}");
        }
    }

    /// Creates an entity populated with the defaults of its archetype.
    ///
    /// # Errors
    /// Returns [`Error::ArchetypeNotFound`] if the archetype is not registered,
    /// [`Error::EntityIdsExhausted`] if no more entity can be created,
    /// or [`Error::ComponentNotFound`] if a default record has no registered table.
    pub fn create_entity(&self, archetype: ArchetypeId) -> Result<Entity> {
        self.create_entity_with(archetype, |_, _| Ok(()))
    }

    /// Creates an entity populated with the defaults of its archetype,
    /// then initialized by `init`.
    ///
    /// If `init` fails, the entity is destroyed without notification and the error is returned.
    ///
    /// # Errors
    /// See [`create_entity`](Self::create_entity).
    pub fn create_entity_with(
        &self,
        archetype: ArchetypeId,
        init: impl FnOnce(&Orchestrator, Entity) -> Result<()>,
    ) -> Result<Entity> {
        let archetype = self.archetype(archetype)?;
        let entity = self.mint_entity(archetype.id())?;

        if let Err(err) = self.populate_entity(&archetype, entity, init) {
            self.rollback(entity);
            return Err(err);
        }

        self.triggers.fire(Trigger::EntityCreated(entity));
        Ok(entity)
    }

    /// Destroys an entity immediately, removing its records from every table.
    ///
    /// If `notify` is set, [`Trigger::EntityDestroyed`] is fired before the records are removed.
    ///
    /// # Errors
    /// Returns [`Error::EntityRecordNotFound`] if the entity does not exist.
    pub fn destroy_entity(&self, entity: Entity, notify: bool) -> Result<()> {
        if !self.entities.lock().contains(entity) {
            return Err(Error::EntityRecordNotFound { entity, table: "entities" });
        }

        if notify {
            self.triggers.fire(Trigger::EntityDestroyed(entity));
        }

        self.with_all_tables_locked(|tables, _| {
            for table in tables {
                if table.has_entity_record(entity) {
                    table.destroy_entity_record(entity)?;
                }
            }
            self.entities.lock().free(entity)?;
            Ok::<_, Error>(())
        })?;

        log::trace!("Destroyed {entity:?}");
        Ok(())
    }

    /// Queues the creation of an entity to the end of the tick.
    ///
    /// The entity id is minted when the creation is committed.
    ///
    /// # Errors
    /// Returns [`Error::ArchetypeNotFound`] if the archetype is not registered.
    pub fn async_create_entity(
        &self,
        archetype: ArchetypeId,
        init: impl FnOnce(&Orchestrator, Entity) -> Result<()> + Send + 'static,
    ) -> Result<()> {
        if !self.archetypes.contains(&archetype) {
            return Err(Error::ArchetypeNotFound { id: archetype.0 });
        }
        self.entities.lock().queue_creation(PendingCreation { archetype, init: Box::new(init) });
        Ok(())
    }

    /// Marks an entity as destroyed and queues its destruction to the end of the tick.
    ///
    /// Queuing an entity that is already marked has no effect.
    ///
    /// # Errors
    /// Returns [`Error::EntityRecordNotFound`] if the entity does not exist.
    pub fn async_destroy_entity(&self, entity: Entity, notify: bool) -> Result<()> {
        if !self.entities.lock().queue_destruction(entity, notify)? {
            log::trace!("{entity:?} is already queued for destruction");
        }
        Ok(())
    }

    /// Destroys all queued entities, one at a time.
    ///
    /// Entities destroyed synchronously after being queued are skipped.
    /// Returns the number of destroyed entities.
    ///
    /// # Errors
    /// Stops at the first failed destruction, which stays queued with the rest.
    pub fn commit_async_entity_destruction(&self) -> Result<usize> {
        let mut count = 0;

        loop {
            let next = self.entities.lock().pop_destruction();
            let pending = match next {
                Some(pending) => pending,
                None => break,
            };

            if !self.entities.lock().contains(pending.entity) {
                log::debug!("Skipping queued destruction of freed {:?}", pending.entity);
                continue;
            }

            if let Err(err) = self.destroy_entity(pending.entity, pending.notify) {
                self.entities.lock().requeue_destruction(pending);
                return Err(err);
            }
            count += 1;
        }

        if count > 0 {
            log::debug!("Committed {count} entity destructions");
        }
        Ok(count)
    }

    /// Creates all queued entities, one at a time.
    ///
    /// Returns the number of created entities.
    ///
    /// # Errors
    /// Stops at the first failed creation.
    /// The failed creation is rolled back and dropped; the rest stay queued.
    pub fn commit_async_entity_creation(&self) -> Result<usize> {
        let mut count = 0;

        loop {
            let next = self.entities.lock().pop_creation();
            let PendingCreation { archetype, init } = match next {
                Some(pending) => pending,
                None => break,
            };

            let archetype = self.archetype(archetype)?;
            self.prepare_tables(&archetype)?;
            let entity = self.mint_entity(archetype.id())?;

            let result =
                self.with_all_tables_locked(|_, _| self.populate_entity(&archetype, entity, init));
            if let Err(err) = result {
                self.rollback(entity);
                return Err(err);
            }

            self.triggers.fire(Trigger::EntityCreated(entity));
            count += 1;
        }

        if count > 0 {
            log::debug!("Committed {count} entity creations");
        }
        Ok(count)
    }

    /// Whether the entity id is live, including entities queued for destruction.
    pub fn entity_exists(&self, entity: Entity) -> bool { self.entities.lock().contains(entity) }

    /// Whether the entity is queued for destruction or no longer exists.
    pub fn is_entity_destroyed(&self, entity: Entity) -> bool {
        self.entities.lock().info(entity).map_or(true, |info| info.destroyed)
    }

    /// The bookkeeping record of a live entity.
    pub fn entity_info(&self, entity: Entity) -> Option<EntityInfo> {
        self.entities.lock().info(entity)
    }

    /// The number of live entities.
    pub fn entity_count(&self) -> usize { self.entities.lock().len() }

    /// The numbers of queued destructions and creations.
    pub fn queued_operations(&self) -> (usize, usize) { self.entities.lock().queued() }

    /// Runs `f` while holding the locks of every instantiated component table.
    ///
    /// `f` receives the tables and the lock set,
    /// which can temporarily release a subset with [`LockSet::scoped_relock`].
    /// Tables instantiated inside `f` are not part of the set.
    pub fn with_all_tables_locked<T>(
        &self,
        f: impl FnOnce(&[Arc<dyn AnyTable>], &mut LockSet<'_>) -> T,
    ) -> T {
        let tables = self.tables.values();
        let mut set = LockSet::new(tables.iter().map(|table| table.table_lock()));
        f(&tables, &mut set)
    }
}

/// Scheduling.
impl Orchestrator {
    fn run_entry(&self, entry: &SystemEntry, tracer: &impl Tracer) -> Result<()> {
        let context = tracer.start_run_system(entry.name);
        let result = entry.system.apply(self);
        tracer.end_run_system(context, entry.name, result.is_ok());

        if let Err(err) = &result {
            log::error!("System {} failed: {err}", entry.name);
        }
        result
    }

    /// Runs all runnable systems, then commits queued destructions, then queued creations.
    ///
    /// Systems returning errors are logged and counted in [`TickStats::systems_failed`].
    ///
    /// # Errors
    /// Returns the error of a system factory or of a commit.
    pub fn tick(&self, tracer: &impl Tracer) -> Result<TickStats> {
        let context = tracer.start_tick();
        let mut stats = TickStats::default();

        let mut runnable = Vec::new();
        for id in self.system_factories.keys() {
            let entry = self.system_entry(id)?;
            if entry.is_paused()
                || entry.system.parent().is_some()
                || !entry.system.is_ready(self)
            {
                tracer.skip_system(entry.name);
                stats.systems_skipped += 1;
            } else {
                runnable.push(entry);
            }
        }

        let failed = AtomicUsize::new(0);
        self.pool.for_each_range(runnable.len(), self.config.system_inline_threshold, &|range| {
            for entry in &runnable[range] {
                if self.run_entry(entry, tracer).is_err() {
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        });
        stats.systems_run = runnable.len();
        stats.systems_failed = failed.into_inner();

        stats.destroyed = self.commit_async_entity_destruction()?;
        tracer.commit_destruction(stats.destroyed);

        stats.created = self.commit_async_entity_creation()?;
        tracer.commit_creation(stats.created);

        tracer.end_tick(context, &stats);
        Ok(stats)
    }

    /// Ticks this orchestrator on a background thread every [`Config::tick_period`].
    pub fn start<T: Tracer + Send + 'static>(self: &Arc<Self>, tracer: T) -> Ticker {
        Ticker::spawn(Arc::clone(self), self.config.tick_period, tracer)
    }

    /// Pauses every system, including systems instantiated later.
    ///
    /// Does nothing if the systems are already paused.
    /// [`System::on_paused`] must not pause or resume all systems.
    pub fn pause_all_systems(&self) { self.set_all_paused(true); }

    /// Resumes every system.
    ///
    /// Does nothing if the systems are not paused.
    pub fn resume_all_systems(&self) { self.set_all_paused(false); }

    /// Whether all systems are paused.
    pub fn all_systems_paused(&self) -> bool { self.paused.load(Ordering::Acquire) }

    fn set_all_paused(&self, paused: bool) {
        {
            let _pause = self.pause_lock.lock();
            if self.paused.swap(paused, Ordering::AcqRel) == paused {
                return;
            }
            for entry in self.systems.values() {
                entry.set_paused(paused);
            }
        }

        log::debug!("{} all systems", if paused { "Paused" } else { "Resumed" });
        if self.config.turbo_on_pause {
            self.power.set_turbo(!paused);
        }
        self.triggers.fire(if paused { Trigger::SystemsPaused } else { Trigger::SystemsResumed });
    }
}

/// Handles.
impl Orchestrator {
    /// The handle table.
    pub fn handles(&self) -> &Arc<Handles> { &self.handles }

    /// Registers an external resource under a new handle id.
    ///
    /// # Errors
    /// Returns [`Error::HandleIdsExhausted`] if no more handle can be added.
    pub fn add_handle(&self, kind: HandleKind, target: Target) -> Result<HandleId> {
        self.handles.add_handle(kind, target)
    }

    /// Replaces the target of a handle and returns the previous one.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHandleId`] if the handle is not live.
    pub fn update_handle(&self, id: HandleId, kind: HandleKind, target: Target) -> Result<Target> {
        self.handles.update_handle(id, kind, target)
    }

    /// Releases a handle and returns its target.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHandleId`] if the handle is not live.
    pub fn release_handle(&self, id: HandleId) -> Result<Target> { self.handles.release_handle(id) }

    /// Resolves a handle of the given kind.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHandleId`] if the handle is not live or of another kind.
    pub fn to_handle(&self, id: HandleId, kind: HandleKind) -> Result<Target> {
        self.handles.to_handle(id, kind)
    }

    /// Resolves a handle of the given kind and downcasts its target.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHandleId`] if the handle is not live, of another kind,
    /// or its target is not a `T`.
    pub fn to_handle_as<T: Any + Send + Sync>(
        &self,
        id: HandleId,
        kind: HandleKind,
    ) -> Result<Arc<T>> {
        self.handles.to_handle_as(id, kind)
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("entities", &self.entity_count())
            .field("tables", &self.tables.len())
            .field("systems", &self.systems.len())
            .field("paused", &self.all_systems_paused())
            .finish_non_exhaustive()
    }
}
