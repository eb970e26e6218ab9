use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::{Error, Result};

/// A concurrent map from ids to shared values, each registry behind its own lock.
///
/// Values are never removed, so an `Arc` returned from the registry
/// stays registered for the lifetime of the registry.
pub(crate) struct Registry<K, V: ?Sized> {
    what: &'static str,
    map:  RwLock<IndexMap<K, Arc<V>>>,
}

impl<K: Eq + Hash + fmt::Debug, V: ?Sized> Registry<K, V> {
    /// Creates an empty registry describing its entries as `what` in errors.
    pub(crate) fn new(what: &'static str) -> Self { Self { what, map: RwLock::default() } }

    /// Gets a cloned arc of the value for the given key.
    pub(crate) fn get(&self, key: &K) -> Option<Arc<V>> { self.map.read().get(key).cloned() }

    /// Whether the key is registered.
    pub(crate) fn contains(&self, key: &K) -> bool { self.map.read().contains_key(key) }

    /// Gets a cloned arc of the value for the given key, or initializes it with `create`.
    ///
    /// `create` runs without holding the registry lock, so it may access the registry.
    /// If two threads initialize the same key concurrently,
    /// both values are created but only the first one inserted is kept.
    pub(crate) fn get_or_try_init<E>(
        &self,
        key: K,
        create: impl FnOnce() -> Result<Arc<V>, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let created = create()?;

        let mut map = self.map.write();
        let value = map.entry(key).or_insert(created);
        Ok(Arc::clone(value))
    }

    /// Registers a value under a new key.
    ///
    /// # Errors
    /// Returns [`Error::AlreadyExists`] if the key is already registered.
    pub(crate) fn insert_new(&self, key: K, value: Arc<V>) -> Result<()> {
        let mut map = self.map.write();
        if map.contains_key(&key) {
            return Err(Error::already_exists(format!("{} {:?}", self.what, key)));
        }
        map.insert(key, value);
        Ok(())
    }

    /// All keys in registration order.
    pub(crate) fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.map.read().keys().cloned().collect()
    }

    /// All values in registration order.
    pub(crate) fn values(&self) -> Vec<Arc<V>> { self.map.read().values().cloned().collect() }

    /// The number of registered values.
    pub(crate) fn len(&self) -> usize { self.map.read().len() }
}
