//! Errors returned by cookiejar operations.
//!
//! Nothing in this crate retries on error.
//! Exhaustion errors are fatal for the affected id space,
//! lookup and duplicate errors indicate a precondition violated by the caller.

use thiserror::Error;

use crate::jar::{Generation, Key};
use crate::table::Entity;

/// The result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error raised by a jar, table, handle table or the orchestrator.
#[derive(Debug, Error)]
pub enum Error {
    /// A [`Mint`](crate::jar::Mint) has no index left to issue.
    #[error("cookies exhausted after issuing {issued} indices")]
    CookiesExhausted {
        /// The number of indices issued before exhaustion.
        issued: usize,
    },
    /// The entity id space is exhausted.
    #[error("entity ids exhausted after issuing {issued} ids")]
    EntityIdsExhausted {
        /// The number of ids issued before exhaustion.
        issued: usize,
    },
    /// The handle id space is exhausted.
    #[error("handle ids exhausted after issuing {issued} ids")]
    HandleIdsExhausted {
        /// The number of ids issued before exhaustion.
        issued: usize,
    },

    /// A component table was requested but never registered.
    #[error("component table {name} is not registered")]
    ComponentNotFound {
        /// The record type name.
        name: &'static str,
    },
    /// A system was requested but never registered.
    #[error("system {name} is not registered")]
    SystemNotFound {
        /// The system type name.
        name: &'static str,
    },
    /// An archetype id was referenced but never registered.
    #[error("archetype {id} is not registered")]
    ArchetypeNotFound {
        /// The archetype id.
        id: u32,
    },
    /// A cookie is not live in the storage it was used with.
    #[error("cookie {index}v{generation} is not live")]
    CookieInvalid {
        /// The index of the cookie.
        index:      usize,
        /// The generation of the cookie.
        generation: Generation,
    },
    /// A handle id is not live, or refers to a resource of another kind.
    #[error("handle {index}v{generation} is not a live handle of the requested kind")]
    InvalidHandleId {
        /// The index of the handle id.
        index:      usize,
        /// The generation of the handle id.
        generation: Generation,
    },
    /// The entity has no record in the table, or does not exist.
    #[error("{entity:?} has no record in {table}")]
    EntityRecordNotFound {
        /// The entity looked up.
        entity: Entity,
        /// The name of the table, or `"entities"` for the entity registry.
        table:  &'static str,
    },

    /// An id is already registered.
    #[error("{what} is already registered")]
    AlreadyExists {
        /// Describes the duplicated registration.
        what: String,
    },
    /// The index of a cookie is already occupied in a storage.
    #[error("cookie {index}v{generation} is already added")]
    CookieAlreadyAdded {
        /// The index of the cookie.
        index:      usize,
        /// The generation of the cookie.
        generation: Generation,
    },

    /// An untyped populate call supplied a value that does not fit the table.
    #[error("invalid data for table {table}: {reason}")]
    InvalidData {
        /// The name of the table.
        table:  &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

impl Error {
    pub(crate) fn cookie_invalid(key: impl Key) -> Self {
        Self::CookieInvalid { index: key.index(), generation: key.generation() }
    }

    pub(crate) fn cookie_already_added(key: impl Key) -> Self {
        Self::CookieAlreadyAdded { index: key.index(), generation: key.generation() }
    }

    pub(crate) fn invalid_handle(key: impl Key) -> Self {
        Self::InvalidHandleId { index: key.index(), generation: key.generation() }
    }

    pub(crate) fn already_exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists { what: what.into() }
    }
}
