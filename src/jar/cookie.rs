use std::fmt;
use std::hash::Hash;

use xias::Xias;

/// An unsigned integer type usable as the index part of a [`Cookie`].
///
/// Narrow types bound the number of distinct indices a [`Mint`](super::Mint) can issue,
/// which is mostly useful for tests and for very small jars.
pub trait Index: Sized + Send + Sync + Copy + fmt::Debug + Eq + Ord + Hash + 'static {
    /// The largest value of this type, used as the index of [`Cookie::INVALID`].
    const MAX: Self;

    /// Converts a dense index into this type.
    ///
    /// Returns `None` if `index` is not representable,
    /// which is how index exhaustion is detected.
    fn from_usize(index: usize) -> Option<Self>;

    /// Converts this index to a `usize` for indexing into vectors.
    fn to_usize(self) -> usize;
}

macro_rules! impl_index {
    ($($ty:ty),*) => {
        $(
            impl Index for $ty {
                const MAX: Self = <$ty>::MAX;

                fn from_usize(index: usize) -> Option<Self> { <$ty>::try_from(index).ok() }

                fn to_usize(self) -> usize { Xias::small_int(self) }
            }
        )*
    }
}

impl_index!(u8, u16, u32, u64, usize);

/// The number of times an index has been recycled.
///
/// The zero generation is never issued,
/// so a cookie carrying it never resolves to anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u32);

impl Generation {
    /// The generation of [`Cookie::INVALID`].
    pub const NONE: Self = Self(0);
    /// The generation assigned to an index the first time it is minted.
    pub const FIRST: Self = Self(1);

    /// Returns the generation that supersedes this one.
    ///
    /// Wraps around on overflow, skipping [`Generation::NONE`].
    #[must_use]
    pub fn next(self) -> Self {
        match self.0.wrapping_add(1) {
            0 => Self::FIRST,
            value => Self(value),
        }
    }

    /// Returns the raw counter value.
    pub fn get(self) -> u32 { self.0 }

    /// Whether this generation was issued after `other`.
    ///
    /// Compares by wrapping distance,
    /// so the answer stays correct across a counter wrap-around.
    pub fn is_newer_than(self, other: Self) -> bool {
        let distance = self.0.wrapping_sub(other.0);
        distance != 0 && distance < 1 << 31
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}

/// An opaque handle identifying a value in a [`Jar`](super::Jar)
/// independent of where the value is stored.
///
/// A cookie is the pair of an index and the generation the index had when it was minted.
/// Once the cookie is returned and its index reissued,
/// the old cookie no longer resolves.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cookie<I: Index = u32> {
    index:      I,
    generation: Generation,
}

impl<I: Index> Cookie<I> {
    /// The sentinel cookie that is never live in any jar.
    pub const INVALID: Self = Self { index: I::MAX, generation: Generation::NONE };

    pub(crate) fn new(index: I, generation: Generation) -> Self { Self { index, generation } }

    /// The index part of the cookie.
    pub fn index(self) -> I { self.index }

    /// The generation part of the cookie.
    pub fn generation(self) -> Generation { self.generation }

    /// Whether this cookie is the [`INVALID`](Self::INVALID) sentinel.
    pub fn is_invalid(self) -> bool { self.generation == Generation::NONE }
}

impl<I: Index> Default for Cookie<I> {
    fn default() -> Self { Self::INVALID }
}

impl<I: Index> fmt::Debug for Cookie<I> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "Cookie(INVALID)")
        } else {
            write!(f, "Cookie({:?}v{})", self.index, self.generation)
        }
    }
}

/// A key that addresses a [`Slots`](super::Slots) storage.
///
/// Two keys with the same index and different generations
/// compete for the same reverse-index entry.
pub trait Key: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// The position of this key in the reverse index.
    fn index(self) -> usize;

    /// The generation of this key.
    fn generation(self) -> Generation;
}

impl<I: Index> Key for Cookie<I> {
    fn index(self) -> usize { self.index.to_usize() }

    fn generation(self) -> Generation { self.generation }
}

#[cfg(test)]
mod tests {
    use super::{Cookie, Generation};

    #[test]
    fn test_generation_wraps_past_none() {
        let generation = Generation(u32::MAX);
        assert_eq!(generation.next(), Generation::FIRST);
    }

    #[test]
    fn test_generation_order_survives_wrap() {
        let last = Generation(u32::MAX);
        assert!(Generation(2).is_newer_than(Generation::FIRST));
        assert!(!Generation::FIRST.is_newer_than(Generation(2)));
        assert!(!Generation::FIRST.is_newer_than(Generation::FIRST));
        assert!(last.next().is_newer_than(last));
        assert!(!last.is_newer_than(last.next()));
    }

    #[test]
    fn test_invalid_sentinel() {
        let invalid = Cookie::<u8>::INVALID;
        assert!(invalid.is_invalid());
        assert_eq!(invalid.index(), u8::MAX);
        assert!(!Cookie::<u8>::new(u8::MAX, Generation::FIRST).is_invalid());
        assert_eq!(Cookie::<u32>::default(), Cookie::INVALID);
    }
}
