use std::{cmp, iter, slice};

use super::Key;
use crate::error::{Error, Result};

/// Marks a reverse-index entry whose key is not stored.
const VACANT: usize = usize::MAX;

/// Dense swap-and-pop storage addressed by keys.
///
/// Values live contiguously in `values`.
/// `owners[slot]` is the key that owns `values[slot]`,
/// and `reverse[key.index()]` is the slot of that key, or [`VACANT`].
///
/// For every stored key `k`, `owners[reverse[k.index()]] == k`.
/// Removing a value moves the last value into the vacated slot,
/// so slot order is not stable, only key identity is.
#[derive(Debug, Clone)]
pub struct Slots<K: Key, T> {
    values:  Vec<T>,
    owners:  Vec<K>,
    reverse: Vec<usize>,
}

impl<K: Key, T> Default for Slots<K, T> {
    fn default() -> Self { Self { values: Vec::new(), owners: Vec::new(), reverse: Vec::new() } }
}

impl<K: Key, T> Slots<K, T> {
    /// Returns the number of stored values.
    pub fn len(&self) -> usize { self.values.len() }

    /// Returns `true` if no values are stored.
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Returns the slot of `key` if it is stored.
    pub fn slot_of(&self, key: K) -> Option<usize> {
        let slot = *self.reverse.get(key.index())?;
        if slot == VACANT {
            return None;
        }

        let owner = self.owners.get(slot).expect("reverse index points past the end");
        (*owner == key).then_some(slot)
    }

    /// Returns the key currently occupying the index of `key`, regardless of generation.
    pub fn occupant(&self, key: K) -> Option<K> {
        let slot = *self.reverse.get(key.index())?;
        if slot == VACANT {
            return None;
        }
        Some(*self.owners.get(slot).expect("reverse index points past the end"))
    }

    /// Returns `true` if `key` is stored.
    pub fn contains(&self, key: K) -> bool { self.slot_of(key).is_some() }

    /// Returns the key owning `slot`.
    pub fn key_at(&self, slot: usize) -> Option<K> { self.owners.get(slot).copied() }

    /// Gets a shared reference to the value of `key`.
    pub fn get(&self, key: K) -> Option<&T> {
        let slot = self.slot_of(key)?;
        self.values.get(slot)
    }

    /// Gets a mutable reference to the value of `key`.
    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        let slot = self.slot_of(key)?;
        self.values.get_mut(slot)
    }

    /// Appends a value for `key`.
    ///
    /// Grows the reverse index to cover `key` if necessary.
    /// The reverse index never shrinks.
    ///
    /// # Errors
    /// Returns [`Error::CookieAlreadyAdded`] if the index of `key` is already occupied.
    pub fn add(&mut self, key: K, value: T) -> Result<usize> {
        let index = key.index();
        if self.reverse.len() <= index {
            self.reverse.resize(index + 1, VACANT);
        }

        let entry = self.reverse.get_mut(index).expect("just resized");
        if *entry != VACANT {
            return Err(Error::cookie_already_added(key));
        }

        let slot = self.values.len();
        *entry = slot;
        self.values.push(value);
        self.owners.push(key);
        Ok(slot)
    }

    /// Removes the value of `key`.
    ///
    /// Returns the slot that now holds the value previously stored after the removed one
    /// (which equals [`len`](Self::len) if the removed value was the last),
    /// together with the removed value.
    ///
    /// # Errors
    /// Returns [`Error::CookieInvalid`] if `key` is not stored.
    pub fn remove(&mut self, key: K) -> Result<(usize, T)> {
        let slot = self.slot_of(key).ok_or_else(|| Error::cookie_invalid(key))?;
        let last = self.values.len() - 1;
        if slot != last {
            self.swap_slots(slot, last);
        }

        let value = self.values.pop().expect("slot_of returned a slot");
        self.owners.pop();
        *self.reverse.get_mut(key.index()).expect("slot_of checked the index") = VACANT;
        Ok((slot, value))
    }

    /// Swaps the values in two slots and fixes up the reverse index of both owners.
    ///
    /// # Panics
    /// Panics if either slot is out of bounds.
    pub fn swap_slots(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }

        self.values.swap(a, b);
        self.owners.swap(a, b);
        for slot in [a, b] {
            let owner = *self.owners.get(slot).expect("swapped slots are in bounds");
            *self.reverse.get_mut(owner.index()).expect("stored keys are covered") = slot;
        }
    }

    /// Sorts the values in place with a stable ordering.
    ///
    /// The reordering is applied through [`swap_slots`](Self::swap_slots),
    /// so key lookups remain valid afterwards.
    pub fn sort_by(&mut self, mut compare: impl FnMut(&T, &T) -> cmp::Ordering) {
        let mut order: Vec<usize> = (0..self.values.len()).collect();
        {
            let values = &self.values;
            order.sort_by(|&a, &b| compare(&values[a], &values[b]));
        }

        // order[slot] is the slot currently holding the value that belongs at `slot`.
        for start in 0..order.len() {
            let mut current = start;
            loop {
                let source = order[current];
                order[current] = current;
                if source == start {
                    break;
                }
                self.swap_slots(current, source);
                current = source;
            }
        }
    }

    /// Removes all values. The reverse index keeps its length.
    pub fn clear(&mut self) {
        for owner in self.owners.drain(..) {
            *self.reverse.get_mut(owner.index()).expect("stored keys are covered") = VACANT;
        }
        self.values.clear();
    }

    /// Iterates over `(key, value)` pairs in slot order.
    pub fn iter(&self) -> iter::Zip<iter::Copied<slice::Iter<'_, K>>, slice::Iter<'_, T>> {
        iter::zip(self.owners.iter().copied(), self.values.iter())
    }

    /// Iterates over `(key, value)` pairs in slot order with mutable values.
    pub fn iter_mut(
        &mut self,
    ) -> iter::Zip<iter::Copied<slice::Iter<'_, K>>, slice::IterMut<'_, T>> {
        iter::zip(self.owners.iter().copied(), self.values.iter_mut())
    }

    /// The keys in slot order.
    pub fn keys(&self) -> &[K] { &self.owners }

    /// The values in slot order.
    pub fn values(&self) -> &[T] { &self.values }

    /// The values in slot order, mutably.
    pub fn values_mut(&mut self) -> &mut [T] { &mut self.values }

    /// The length of the reverse index,
    /// i.e. one more than the largest key index ever added.
    pub fn reverse_len(&self) -> usize { self.reverse.len() }
}
