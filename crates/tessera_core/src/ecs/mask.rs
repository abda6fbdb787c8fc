//! # Component Masks
//!
//! A 64-bit flag set naming which component kinds are attached to a slot.
//! Every component kind owns exactly one bit, so a store can know at most
//! 64 kinds.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Set of component kinds, one bit per kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ComponentMask(u64);

impl ComponentMask {
    /// Mask with no component kinds.
    pub const EMPTY: Self = Self(0);

    /// Number of distinct component kinds a mask can hold.
    pub const BITS: u32 = u64::BITS;

    /// Wraps raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Mask with the single bit for component `id` set.
    ///
    /// # Panics
    ///
    /// Panics if `id` is 64 or more. In a `const` context this is a
    /// compile-time error.
    #[inline]
    #[must_use]
    pub const fn from_id(id: u8) -> Self {
        assert!((id as u32) < Self::BITS, "component id must be in 0..64");
        Self(1 << id)
    }

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns `true` if no bit is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of component kinds in the mask.
    #[inline]
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Returns `true` if every bit of `other` is also set in `self`.
    #[inline]
    #[must_use]
    pub const fn contains_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if `self` and `other` share at least one bit.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns `true` if component `id` is present.
    #[inline]
    #[must_use]
    pub const fn has(self, id: u8) -> bool {
        (id as u32) < Self::BITS && (self.0 >> id) & 1 == 1
    }

    /// Iterates the component ids in the mask, lowest first.
    pub fn ids(self) -> impl Iterator<Item = u8> {
        let mut remaining = self.0;
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            // trailing_zeros of a non-zero u64 is at most 63
            let id = remaining.trailing_zeros() as u8;
            remaining &= remaining - 1;
            Some(id)
        })
    }
}

impl BitOr for ComponentMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ComponentMask {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ComponentMask {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for ComponentMask {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for ComponentMask {
    type Output = Self;

    #[inline]
    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl From<u64> for ComponentMask {
    fn from(bits: u64) -> Self {
        Self(bits)
    }
}

impl fmt::Display for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
