//! A jar is dense storage with stable external handles ("cookies").
//!
//! Values are kept contiguously so that iteration is cache-friendly,
//! and removal is O(1) by moving the last value into the vacated slot.
//! Each value is identified by a [`Cookie`] that survives such compaction.
//!
//! Cookies carry a [`Generation`].
//! When a cookie is removed, its index is recycled through a LIFO free list
//! and the generation of the index is bumped,
//! so a stale cookie held across the removal no longer resolves.
//!
//! A `Jar` is not synchronized by itself:
//! mutation requires `&mut Jar`, which is obtained either by unique ownership
//! or through the lock that owns it (e.g. a [`TableLock`](crate::lock::TableLock)).

use std::{cmp, ops};

use crate::error::{Error, Result};

mod cookie;
pub use cookie::{Cookie, Generation, Index, Key};

mod mint;
pub use mint::Mint;

mod slots;
pub use slots::Slots;

/// Dense storage of `T` keyed by cookies minted by the jar itself.
#[derive(Debug)]
pub struct Jar<T, I: Index = u32> {
    mint:  Mint<I>,
    slots: Slots<Cookie<I>, T>,
}

impl<T, I: Index> Default for Jar<T, I> {
    fn default() -> Self { Self { mint: Mint::default(), slots: Slots::default() } }
}

impl<T, I: Index> Jar<T, I> {
    /// Creates an empty jar.
    pub fn new() -> Self { Self::default() }

    /// Mints a cookie without storing anything under it.
    ///
    /// # Errors
    /// Returns [`Error::CookiesExhausted`] if no more cookies can be issued.
    pub fn next_cookie(&mut self) -> Result<Cookie<I>> { self.mint.next_cookie() }

    /// Returns an unused cookie to the free list.
    ///
    /// # Errors
    /// Returns [`Error::CookieInvalid`] if the cookie is not current.
    pub fn return_cookie(&mut self, cookie: Cookie<I>) -> Result<()> {
        if self.slots.contains(cookie) {
            // a stored cookie must go through `remove`
            return Err(Error::cookie_already_added(cookie));
        }
        self.mint.return_cookie(cookie)
    }

    /// Stores a value under a freshly minted cookie.
    ///
    /// # Errors
    /// Returns [`Error::CookiesExhausted`] if no more cookies can be issued.
    pub fn insert(&mut self, value: T) -> Result<Cookie<I>> { self.emplace(|_| value) }

    /// Stores the value built by `build` under a freshly minted cookie.
    ///
    /// `build` receives the cookie, so the value can refer to itself.
    ///
    /// # Errors
    /// Returns [`Error::CookiesExhausted`] if no more cookies can be issued.
    /// If storing fails, the cookie is returned to the free list before the error propagates.
    pub fn emplace(&mut self, build: impl FnOnce(Cookie<I>) -> T) -> Result<Cookie<I>> {
        let cookie = self.mint.next_cookie()?;
        match self.slots.add(cookie, build(cookie)) {
            Ok(_) => Ok(cookie),
            Err(err) => {
                self.mint.return_cookie(cookie).expect("cookie was just minted");
                Err(err)
            }
        }
    }

    /// Stores a value under a cookie previously obtained from [`next_cookie`](Self::next_cookie).
    ///
    /// Returns the slot of the value.
    ///
    /// # Errors
    /// Returns [`Error::CookieAlreadyAdded`] if the cookie is already live,
    /// or [`Error::CookieInvalid`] if it was not minted by this jar or has been returned.
    pub fn add(&mut self, cookie: Cookie<I>, value: T) -> Result<usize> {
        if self.slots.contains(cookie) {
            return Err(Error::cookie_already_added(cookie));
        }
        if !self.mint.is_current(cookie) {
            return Err(Error::cookie_invalid(cookie));
        }
        self.slots.add(cookie, value)
    }

    /// Removes the value of `cookie` and recycles the cookie.
    ///
    /// Returns the slot that now holds the value that used to follow the removed one,
    /// so that removal during index-based iteration continues from the returned slot.
    ///
    /// # Errors
    /// Returns [`Error::CookieInvalid`] if the cookie is not live.
    pub fn remove(&mut self, cookie: Cookie<I>) -> Result<usize> {
        let (next, _) = self.remove_entry(cookie)?;
        Ok(next)
    }

    /// Removes the value of `cookie`, recycles the cookie and returns the value.
    ///
    /// # Errors
    /// Returns [`Error::CookieInvalid`] if the cookie is not live.
    pub fn take(&mut self, cookie: Cookie<I>) -> Result<T> {
        let (_, value) = self.remove_entry(cookie)?;
        Ok(value)
    }

    fn remove_entry(&mut self, cookie: Cookie<I>) -> Result<(usize, T)> {
        let (next, value) = self.slots.remove(cookie)?;
        self.mint.return_cookie(cookie).expect("stored cookies are current");
        log::trace!("removed {cookie:?}, next slot {next}");
        Ok((next, value))
    }

    /// Returns the slot of `cookie` if it is live.
    pub fn find(&self, cookie: Cookie<I>) -> Option<usize> { self.slots.slot_of(cookie) }

    /// Returns `true` if `cookie` is live.
    pub fn contains(&self, cookie: Cookie<I>) -> bool { self.slots.contains(cookie) }

    /// Gets a shared reference to the value of `cookie`.
    pub fn get(&self, cookie: Cookie<I>) -> Option<&T> { self.slots.get(cookie) }

    /// Gets a mutable reference to the value of `cookie`.
    pub fn get_mut(&mut self, cookie: Cookie<I>) -> Option<&mut T> { self.slots.get_mut(cookie) }

    /// Returns the cookie owning `slot`.
    pub fn cookie_at(&self, slot: usize) -> Option<Cookie<I>> { self.slots.key_at(slot) }

    /// Returns the number of live values.
    pub fn len(&self) -> usize { self.slots.len() }

    /// Returns `true` if the jar holds no values.
    pub fn is_empty(&self) -> bool { self.slots.is_empty() }

    /// Iterates over `(cookie, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Cookie<I>, &T)> + '_ { self.slots.iter() }

    /// Iterates over `(cookie, value)` pairs in slot order with mutable values.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Cookie<I>, &mut T)> + '_ {
        self.slots.iter_mut()
    }

    /// The values in slot order.
    pub fn values(&self) -> &[T] { self.slots.values() }

    /// Sorts the values in place, keeping cookie lookups valid.
    pub fn sort_by(&mut self, compare: impl FnMut(&T, &T) -> cmp::Ordering) {
        self.slots.sort_by(compare);
    }

    /// The cookie mint of this jar.
    pub fn mint(&self) -> &Mint<I> { &self.mint }
}

impl<T, I: Index> ops::Index<Cookie<I>> for Jar<T, I> {
    type Output = T;

    fn index(&self, cookie: Cookie<I>) -> &T {
        match self.get(cookie) {
            Some(value) => value,
            None => panic!("{cookie:?} is not live in this jar"),
        }
    }
}

impl<T, I: Index> ops::IndexMut<Cookie<I>> for Jar<T, I> {
    fn index_mut(&mut self, cookie: Cookie<I>) -> &mut T {
        match self.get_mut(cookie) {
            Some(value) => value,
            None => panic!("{cookie:?} is not live in this jar"),
        }
    }
}
