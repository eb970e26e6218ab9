//! All-or-nothing acquisition of multiple table locks.
//!
//! A [`LockSet`] sorts its locks by address and acquires them as one unit:
//! it blocks on the first lock, then tries the rest without blocking.
//! If any of them is unavailable, everything acquired so far is released,
//! the thread backs off for a random duration and the round starts over.
//! After [`ORDERED_FALLBACK_ROUNDS`] failed rounds,
//! the locks are acquired one by one in address order,
//! which cannot deadlock against other lock sets.
//!
//! Locks already held by the current thread are acquired recursively,
//! so a lock set may be nested inside another lock set covering the same tables.
//! A nested lock set that adds tables not held by the outer scope
//! should only add tables ordered after those held,
//! or release the outer locks first with [`LockSet::scoped_relock`].

use std::marker::PhantomData;
use std::{fmt, hint, thread};

use itertools::Itertools;
use rand::Rng;

use super::{Lockable, RawTableLock};

/// The number of failed try-rounds before falling back to ordered blocking acquisition.
pub const ORDERED_FALLBACK_ROUNDS: u32 = 8;

/// The upper bound of the random backoff after a failed round, in spin iterations.
const MAX_BACKOFF_SPINS: u32 = 1 << 10;

struct Entry<'t> {
    lock:       &'t RawTableLock,
    /// Whether this set is responsible for locking the table.
    controlled: bool,
    held:       bool,
}

/// A set of table locks acquired and released as one unit.
///
/// All controlled locks are released when the set is dropped.
/// The locks are owned by the acquiring thread, so a set cannot be sent to another thread.
pub struct LockSet<'t> {
    entries:   Vec<Entry<'t>>,
    _not_send: PhantomData<*const ()>,
}

static_assertions::assert_not_impl_any!(LockSet<'static>: Send, Sync);

impl<'t> LockSet<'t> {
    /// Starts building a lock set.
    pub fn builder() -> LockSetBuilder<'t> { LockSetBuilder { locks: Vec::new() } }

    /// Acquires all `locks` as one unit.
    pub fn new(locks: impl IntoIterator<Item = &'t RawTableLock>) -> Self {
        let mut builder = Self::builder();
        for lock in locks {
            builder = builder.add(lock);
        }
        builder.acquire()
    }

    fn from_locks(locks: Vec<(&'t RawTableLock, bool)>) -> Self {
        let entries = locks
            .into_iter()
            .sorted_by_key(|(lock, _)| lock.id())
            .group_by(|(lock, _)| lock.id())
            .into_iter()
            .map(|(_, mut group)| {
                let (lock, mut controlled) = group.next().expect("groups are non-empty");
                for (_, other) in group {
                    controlled &= other;
                }
                Entry { lock, controlled, held: false }
            })
            .collect();

        let mut set = Self { entries, _not_send: PhantomData };
        let all: Vec<usize> = (0..set.entries.len()).collect();
        set.lock_entries(&all);
        set
    }

    /// The number of distinct tables in this set, including excluded ones.
    pub fn len(&self) -> usize { self.entries.len() }

    /// Whether this set contains no tables.
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    fn position(&self, table: &(impl Lockable + ?Sized)) -> Option<usize> {
        let id = table.table_lock().id();
        self.entries.binary_search_by_key(&id, |entry| entry.lock.id()).ok()
    }

    /// Whether this set is responsible for locking `table`.
    ///
    /// Returns `false` for tables that are not in the set
    /// and for tables that were [excluded](LockSetBuilder::exclude)
    /// because an enclosing scope already holds them.
    pub fn controlling(&self, table: &(impl Lockable + ?Sized)) -> bool {
        match self.position(table) {
            Some(index) => self.entries[index].controlled,
            None => false,
        }
    }

    /// Whether this set currently holds its lock on `table`.
    pub fn is_held(&self, table: &(impl Lockable + ?Sized)) -> bool {
        match self.position(table) {
            Some(index) => self.entries[index].held,
            None => false,
        }
    }

    fn subset_entries(&self, subset: &[&dyn Lockable]) -> Vec<usize> {
        subset.iter().filter_map(|table| self.position(*table)).sorted().dedup().collect()
    }

    /// Releases the controlled locks of `subset` that this set currently holds.
    ///
    /// Tables not in this set or not controlled by it are ignored.
    pub fn unlock_if(&mut self, subset: &[&dyn Lockable]) {
        let indices = self.subset_entries(subset);
        self.unlock_entries(&indices);
    }

    /// Reacquires the controlled locks of `subset` that this set does not currently hold.
    ///
    /// Held locks ordered after the reacquired ones are released first
    /// and acquired again together with them, so acquisition order is preserved.
    pub fn lock_if(&mut self, subset: &[&dyn Lockable]) {
        let indices = self.subset_entries(subset);
        self.lock_entries(&indices);
    }

    /// Releases the controlled locks of `subset` until the returned guard is dropped,
    /// at which point the whole set is reacquired through the all-or-nothing protocol.
    ///
    /// This allows code holding a lock set to call into code that locks an unrelated table
    /// without violating the acquisition order.
    pub fn scoped_relock<'s>(&'s mut self, subset: &[&dyn Lockable]) -> Relock<'s, 't> {
        self.unlock_if(subset);
        Relock { set: self }
    }

    /// Releases every lock this set holds.
    pub fn release(&mut self) {
        let all: Vec<usize> = (0..self.entries.len()).collect();
        self.unlock_entries(&all);
    }

    fn unlock_entries(&mut self, indices: &[usize]) {
        for &index in indices.iter().rev() {
            let entry = &mut self.entries[index];
            if entry.controlled && entry.held {
                entry.lock.unlock();
                entry.held = false;
            }
        }
    }

    fn lock_entries(&mut self, indices: &[usize]) {
        let Some(first) = indices
            .iter()
            .copied()
            .filter(|&index| self.entries[index].controlled && !self.entries[index].held)
            .min()
        else {
            return;
        };

        let held_after: Vec<usize> = (first..self.entries.len())
            .filter(|&index| self.entries[index].controlled && self.entries[index].held)
            .collect();
        self.unlock_entries(&held_after);

        let targets: Vec<usize> = indices
            .iter()
            .copied()
            .chain(held_after)
            .filter(|&index| self.entries[index].controlled && !self.entries[index].held)
            .sorted()
            .dedup()
            .collect();

        let locks: Vec<&RawTableLock> =
            targets.iter().map(|&index| self.entries[index].lock).collect();
        acquire(&locks);

        for index in targets {
            self.entries[index].held = true;
        }
    }
}

impl<'t> Drop for LockSet<'t> {
    fn drop(&mut self) { self.release(); }
}

impl<'t> fmt::Debug for LockSet<'t> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| {
                (entry.lock.name(), if entry.controlled { entry.held } else { false })
            }))
            .finish()
    }
}

/// Builds a [`LockSet`].
pub struct LockSetBuilder<'t> {
    locks: Vec<(&'t RawTableLock, bool)>,
}

impl<'t> LockSetBuilder<'t> {
    /// Adds a table to lock.
    #[must_use]
    pub fn add<L: Lockable + ?Sized>(mut self, table: &'t L) -> Self {
        self.locks.push((table.table_lock(), true));
        self
    }

    /// Adds a table that an enclosing scope already holds.
    ///
    /// The table is part of the set but is never locked or released by it.
    /// Excluding a table takes precedence over adding it.
    #[must_use]
    pub fn exclude<L: Lockable + ?Sized>(mut self, table: &'t L) -> Self {
        self.locks.push((table.table_lock(), false));
        self
    }

    /// Acquires all added tables as one unit.
    pub fn acquire(self) -> LockSet<'t> { LockSet::from_locks(self.locks) }
}

/// Reacquires a [`LockSet`] on drop.
///
/// Returned by [`LockSet::scoped_relock`].
pub struct Relock<'s, 't> {
    set: &'s mut LockSet<'t>,
}

impl<'s, 't> Relock<'s, 't> {
    /// The lock set being relocked.
    pub fn set(&self) -> &LockSet<'t> { self.set }
}

impl<'s, 't> Drop for Relock<'s, 't> {
    fn drop(&mut self) {
        // all controlled locks are released and reacquired as one unit
        self.set.release();
        let all: Vec<usize> = (0..self.set.entries.len()).collect();
        self.set.lock_entries(&all);
    }
}

/// Acquires `locks`, which must be sorted by address, as one unit.
fn acquire(locks: &[&RawTableLock]) {
    let Some((first, rest)) = locks.split_first() else { return };

    let mut rounds = 0;
    loop {
        first.lock();

        let Some(failed) = rest.iter().position(|lock| !lock.try_lock()) else { return };

        // locks[0..=failed] were acquired in this round
        for lock in locks[..=failed].iter().rev() {
            lock.unlock();
        }

        rounds += 1;
        if rounds >= ORDERED_FALLBACK_ROUNDS {
            log::trace!(
                "Falling back to ordered acquisition of {} locks after {rounds} rounds",
                locks.len()
            );
            for lock in locks {
                lock.lock();
            }
            return;
        }

        backoff(rounds);
    }
}

fn backoff(round: u32) {
    let ceiling = (1u32 << round.min(10)).min(MAX_BACKOFF_SPINS);
    let spins = rand::thread_rng().gen_range(0..=ceiling);
    if spins > MAX_BACKOFF_SPINS / 2 {
        thread::yield_now();
    } else {
        for _ in 0..spins {
            hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests;
