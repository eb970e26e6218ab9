//! Per-table locks and the multi-table locking protocol.
//!
//! Every table owns one [`RawTableLock`].
//! It is recursive: the thread holding it may lock it again,
//! which is what allows a system holding a [`LockSet`] to call table methods
//! that lock the same table internally.
//!
//! Waiting threads spin for a configurable number of rounds
//! and then park on the lock's address until the holder releases it.
//! There is no timeout; a wait that never ends is a deadlock bug,
//! which the optional [`profile`] hook helps to diagnose.

use std::cell::{RefCell, RefMut};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use std::{fmt, hint, ops, thread};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

pub mod profile;
use profile::{ContentionProfiler, LockProfile};

pub mod set;
pub use set::{LockSet, Relock};

#[cfg(test)]
mod tests;

const UNLOCKED: u8 = 0;
const LOCKED: u8 = 1;
const PARKED: u8 = 2;

/// Spins before a waiting thread starts yielding its time slice.
const SPINS_BEFORE_YIELD: u32 = 16;

/// The default number of spin rounds before a waiting thread parks.
pub const DEFAULT_SPIN_LIMIT: u32 = 64;

/// Identifies the calling thread for lock ownership.
///
/// Tokens are never zero, so zero can mean "no owner".
pub(crate) fn current_thread() -> usize {
    static NEXT: AtomicUsize = AtomicUsize::new(1);

    thread_local! {
        static TOKEN: usize = NEXT.fetch_add(1, Ordering::Relaxed);
    }

    TOKEN.with(|token| *token)
}

/// A recursive spin lock guarding one table.
///
/// The lock does not own data; [`TableLock`] pairs it with the table contents.
/// Its address is its identity, which [`LockSet`] uses to order acquisitions.
pub struct RawTableLock {
    state:      AtomicU8,
    /// The token of the owning thread, or 0.
    owner:      AtomicUsize,
    /// Recursion depth, only accessed by the owning thread.
    depth:      AtomicUsize,
    name:       &'static str,
    spin_limit: u32,
    profile:    Option<LockProfile>,
}

impl RawTableLock {
    /// Creates an unlocked lock.
    pub fn new(name: &'static str) -> Self { Self::with_options(name, DEFAULT_SPIN_LIMIT, None) }

    /// Creates an unlocked lock with a custom spin limit and an optional contention profiler.
    pub fn with_options(
        name: &'static str,
        spin_limit: u32,
        profiler: Option<Arc<ContentionProfiler>>,
    ) -> Self {
        Self {
            state: AtomicU8::new(UNLOCKED),
            owner: AtomicUsize::new(0),
            depth: AtomicUsize::new(0),
            name,
            spin_limit,
            profile: profiler.map(LockProfile::new),
        }
    }

    /// The name of the table this lock guards.
    pub fn name(&self) -> &'static str { self.name }

    /// The identity of this lock, used to order acquisitions globally.
    pub fn id(&self) -> usize { self as *const Self as usize }

    /// Acquires the lock, blocking until it is available.
    ///
    /// Returns immediately if the current thread already holds the lock.
    pub fn lock(&self) {
        let me = current_thread();
        if self.owner.load(Ordering::Relaxed) == me {
            self.depth.fetch_add(1, Ordering::Relaxed);
            return;
        }

        if self
            .state
            .compare_exchange_weak(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            match &self.profile {
                Some(profile) => {
                    let holder = self.owner.load(Ordering::Relaxed);
                    let start = Instant::now();
                    self.lock_slow();
                    profile.record(self.name, holder, start.elapsed());
                }
                None => self.lock_slow(),
            }
        }

        self.owner.store(me, Ordering::Relaxed);
        self.depth.store(1, Ordering::Relaxed);
    }

    /// Attempts to acquire the lock without blocking.
    ///
    /// Always succeeds if the current thread already holds the lock.
    pub fn try_lock(&self) -> bool {
        let me = current_thread();
        if self.owner.load(Ordering::Relaxed) == me {
            self.depth.fetch_add(1, Ordering::Relaxed);
            return true;
        }

        let mut state = self.state.load(Ordering::Relaxed);
        loop {
            if state & LOCKED != 0 {
                return false;
            }
            match self.state.compare_exchange_weak(
                state,
                state | LOCKED,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => state = actual,
            }
        }

        self.owner.store(me, Ordering::Relaxed);
        self.depth.store(1, Ordering::Relaxed);
        true
    }

    /// Releases one level of the lock.
    ///
    /// # Panics
    /// Panics if the current thread does not hold the lock.
    pub fn unlock(&self) {
        assert!(
            self.is_owned_by_current_thread(),
            "table lock {} is released by a thread that does not hold it",
            self.name
        );

        if self.depth.fetch_sub(1, Ordering::Relaxed) > 1 {
            return;
        }

        self.owner.store(0, Ordering::Relaxed);
        if self
            .state
            .compare_exchange(LOCKED, UNLOCKED, Ordering::Release, Ordering::Relaxed)
            .is_err()
        {
            self.unlock_slow();
        }
    }

    /// Whether any thread holds the lock.
    pub fn is_locked(&self) -> bool { self.state.load(Ordering::Relaxed) & LOCKED != 0 }

    /// Whether the current thread holds the lock.
    pub fn is_owned_by_current_thread(&self) -> bool {
        self.owner.load(Ordering::Relaxed) == current_thread()
    }

    /// The recursion depth of the current thread, or 0 if it does not hold the lock.
    pub fn depth(&self) -> usize {
        if self.is_owned_by_current_thread() {
            self.depth.load(Ordering::Relaxed)
        } else {
            0
        }
    }

    fn park_key(&self) -> usize { self.id() }

    #[cold]
    fn lock_slow(&self) {
        let mut spins = 0;
        let mut state = self.state.load(Ordering::Relaxed);

        loop {
            if state & LOCKED == 0 {
                match self.state.compare_exchange_weak(
                    state,
                    state | LOCKED,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return,
                    Err(actual) => {
                        state = actual;
                        continue;
                    }
                }
            }

            if state & PARKED == 0 && spins < self.spin_limit {
                spins += 1;
                if spins <= SPINS_BEFORE_YIELD {
                    hint::spin_loop();
                } else {
                    thread::yield_now();
                }
                state = self.state.load(Ordering::Relaxed);
                continue;
            }

            if state & PARKED == 0 {
                if let Err(actual) = self.state.compare_exchange_weak(
                    state,
                    state | PARKED,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    state = actual;
                    continue;
                }
            }

            let validate = || self.state.load(Ordering::Relaxed) == LOCKED | PARKED;
            // SAFETY: the key is the address of this lock, which outlives the wait,
            // and no other parking_lot_core call is made from the callbacks.
            unsafe {
                parking_lot_core::park(
                    self.park_key(),
                    validate,
                    || {},
                    |_, _| {},
                    DEFAULT_PARK_TOKEN,
                    None,
                );
            }

            spins = 0;
            state = self.state.load(Ordering::Relaxed);
        }
    }

    #[cold]
    fn unlock_slow(&self) {
        let callback = |result: parking_lot_core::UnparkResult| {
            let state = if result.have_more_threads { PARKED } else { UNLOCKED };
            self.state.store(state, Ordering::Release);
            DEFAULT_UNPARK_TOKEN
        };
        // SAFETY: the key is the address of this lock and the callback does not park.
        unsafe {
            parking_lot_core::unpark_one(self.park_key(), callback);
        }
    }
}

impl fmt::Debug for RawTableLock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RawTableLock")
            .field("name", &self.name)
            .field("locked", &self.is_locked())
            .field("owner", &self.owner.load(Ordering::Relaxed))
            .finish()
    }
}

/// Something that is guarded by a [`RawTableLock`].
pub trait Lockable {
    /// The lock guarding this object.
    fn table_lock(&self) -> &RawTableLock;
}

impl Lockable for RawTableLock {
    fn table_lock(&self) -> &RawTableLock { self }
}

/// Table contents guarded by a [`RawTableLock`].
///
/// The lock may already be held by the current thread through a [`LockSet`];
/// [`lock`](Self::lock) then only increments the recursion depth.
/// Two [`TableGuard`]s of the same table cannot coexist on one thread.
pub struct TableLock<T: ?Sized> {
    raw:  RawTableLock,
    data: RefCell<T>,
}

// SAFETY: `data` is only accessed by the thread holding `raw`.
unsafe impl<T: ?Sized + Send> Send for TableLock<T> {}
// SAFETY: `data` is only accessed by the thread holding `raw`,
// so sharing the lock only ever exposes `T` to one thread at a time.
unsafe impl<T: ?Sized + Send> Sync for TableLock<T> {}

impl<T> TableLock<T> {
    /// Wraps `value` with a new lock.
    pub fn new(name: &'static str, value: T) -> Self {
        Self::with_raw(RawTableLock::new(name), value)
    }

    /// Wraps `value` with an existing lock.
    pub fn with_raw(raw: RawTableLock, value: T) -> Self { Self { raw, data: RefCell::new(value) } }
}

impl<T: ?Sized> TableLock<T> {
    /// Locks the table and borrows its contents.
    ///
    /// # Panics
    /// Panics if the current thread already holds a guard of this table.
    pub fn lock(&self) -> TableGuard<'_, T> {
        self.raw.lock();
        let raw = RawGuard(&self.raw);

        let data = match self.data.try_borrow_mut() {
            Ok(data) => data,
            Err(_) => panic!(
                "table {} is already borrowed by this thread; nested table guards are not \
                 supported",
                self.raw.name
            ),
        };

        TableGuard { data, _raw: raw }
    }

    /// Accesses the contents through unique access, without locking.
    pub fn get_mut(&mut self) -> &mut T { self.data.get_mut() }
}

impl<T: ?Sized> Lockable for TableLock<T> {
    fn table_lock(&self) -> &RawTableLock { &self.raw }
}

/// Releases one level of a [`RawTableLock`] on drop.
struct RawGuard<'t>(&'t RawTableLock);

impl<'t> Drop for RawGuard<'t> {
    fn drop(&mut self) { self.0.unlock(); }
}

/// Exclusive access to the contents of a [`TableLock`].
pub struct TableGuard<'t, T: ?Sized> {
    // Declared before `_raw` so that the borrow ends before the lock is released.
    data: RefMut<'t, T>,
    _raw: RawGuard<'t>,
}

impl<'t, T: ?Sized> ops::Deref for TableGuard<'t, T> {
    type Target = T;

    fn deref(&self) -> &T { &self.data }
}

impl<'t, T: ?Sized> ops::DerefMut for TableGuard<'t, T> {
    fn deref_mut(&mut self) -> &mut T { &mut self.data }
}
