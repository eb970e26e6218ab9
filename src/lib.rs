//! An in-process entity/component store with a cooperative scheduler.
//!
//! Many short-lived units of logic ("systems") read and write shared typed tables
//! concurrently at high frequency.
//!
//! # Jars
//! Every stored value is addressed by a generational [`Cookie`](jar::Cookie)
//! that survives compaction of the dense storage.
//! Insertion and removal are O(1), and removal never leaves holes:
//! the last value moves into the vacated slot.
//! A [`Jar`](jar::Jar) mints its own cookies,
//! while a component [`Table`](table::Table) is keyed by [`Entity`] ids
//! minted by the [`Orchestrator`].
//!
//! # Locking
//! Each table owns a recursive [`RawTableLock`](lock::RawTableLock).
//! A system that needs tables A and C acquires them together as a [`LockSet`](lock::LockSet),
//! which sorts the locks into one global order,
//! so two systems requesting overlapping sets in different orders never deadlock.
//! Readers that do not want to hold a lock use a [snapshot](table::Table::scoped_snapshot),
//! which only ever shrinks while it is in use.
//!
//! # Ticks
//! The orchestrator runs all ready systems,
//! then commits entity destructions and creations queued during the tick,
//! so iteration in progress is never invalidated mid-tick.
//!
//! ```
//! use cookiejar::orchestrator::{Archetype, ArchetypeId};
//! use cookiejar::{tracer, Orchestrator, Record};
//!
//! #[derive(Debug, Clone, PartialEq, Record)]
//! struct Position {
//!     x: f32,
//!     y: f32,
//! }
//!
//! # fn main() -> cookiejar::Result<()> {
//! let orchestrator = Orchestrator::builder().concurrency(0).build();
//! orchestrator.register_component::<Position>()?;
//! orchestrator.register_archetype(
//!     Archetype::new(ArchetypeId(1), "point").with_default(Position { x: 0.0, y: 0.0 }),
//! )?;
//!
//! let entity = orchestrator.create_entity(ArchetypeId(1))?;
//! let positions = orchestrator.component::<Position>()?;
//! positions.populate(entity, Position { x: 1.0, y: 2.0 })?;
//!
//! orchestrator.async_destroy_entity(entity, true)?;
//! let stats = orchestrator.tick(&tracer::Noop)?;
//! assert_eq!(stats.destroyed, 1);
//! assert!(!positions.has_entity_record(entity));
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(debug_assertions), deny(missing_docs))]
#![cfg_attr(doc, warn(missing_docs))]

pub mod error;
pub use error::{Error, Result};

pub mod jar;

pub mod lock;

pub mod table;
pub use table::{Entity, Table};

pub mod handle;

pub mod trigger;

pub mod host;

pub mod pool;

mod registry;

pub mod tracer;

pub mod orchestrator;
pub use orchestrator::Orchestrator;

#[cfg(any(test, feature = "internal-bench"))]
pub mod test_util;

pub mod util;

/// Derives [`table::Record`] for a struct.
///
/// See the [codegen crate](cookiejar_codegen) for the accepted attributes.
pub use cookiejar_codegen::Record;
