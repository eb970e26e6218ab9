use super::{Cookie, Generation, Index, Key};
use crate::error::{Error, Result};

/// Issues and recycles [`Cookie`]s.
///
/// Fresh indices come from a monotonic gauge.
/// Returned indices are pushed onto a LIFO free list and reissued before the gauge moves again.
/// The generation of an index is bumped when it is returned,
/// so every cookie issued before the return stops being current.
#[derive(Debug)]
pub struct Mint<I: Index = u32> {
    /// The next index to issue from the gauge.
    gauge:       usize,
    /// The current generation of each issued index.
    generations: Vec<Generation>,
    /// Recycled indices, most recently returned last.
    free:        Vec<I>,
}

impl<I: Index> Default for Mint<I> {
    fn default() -> Self { Self { gauge: 0, generations: Vec::new(), free: Vec::new() } }
}

impl<I: Index> Mint<I> {
    /// Issues a cookie.
    ///
    /// # Errors
    /// Returns [`Error::CookiesExhausted`] if the free list is empty
    /// and the gauge has reached the end of the index type.
    pub fn next_cookie(&mut self) -> Result<Cookie<I>> {
        if let Some(index) = self.free.pop() {
            let generation = *self
                .generations
                .get(index.to_usize())
                .expect("free list only contains issued indices");
            log::trace!("reissue cookie index {index:?} at generation {generation}");
            return Ok(Cookie::new(index, generation));
        }

        let index = I::from_usize(self.gauge)
            .ok_or(Error::CookiesExhausted { issued: self.gauge })?;
        self.gauge += 1;
        self.generations.push(Generation::FIRST);
        Ok(Cookie::new(index, Generation::FIRST))
    }

    /// Returns a cookie to the free list.
    ///
    /// The caller must ensure the cookie is no longer referenced by any storage.
    ///
    /// # Errors
    /// Returns [`Error::CookieInvalid`] if the cookie is not current,
    /// e.g. because it was already returned.
    pub fn return_cookie(&mut self, cookie: Cookie<I>) -> Result<()> {
        let generation = match self.generations.get_mut(Key::index(cookie)) {
            Some(generation) if *generation == cookie.generation() => generation,
            _ => return Err(Error::cookie_invalid(cookie)),
        };

        *generation = generation.next();
        self.free.push(cookie.index());
        Ok(())
    }

    /// Whether `cookie` was issued by this mint and has not been returned since.
    pub fn is_current(&self, cookie: Cookie<I>) -> bool {
        match self.generations.get(Key::index(cookie)) {
            Some(&generation) => generation == cookie.generation() && !cookie.is_invalid(),
            None => false,
        }
    }

    /// The number of distinct indices ever issued.
    ///
    /// This is also the length a reverse index needs to cover every issued cookie.
    pub fn issued(&self) -> usize { self.gauge }

    /// The number of indices waiting in the free list.
    pub fn recyclable(&self) -> usize { self.free.len() }

    /// The number of cookies that are currently outstanding.
    pub fn outstanding(&self) -> usize { self.gauge - self.free.len() }
}

#[cfg(test)]
mod tests;
