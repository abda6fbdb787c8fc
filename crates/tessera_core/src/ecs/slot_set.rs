//! # Slot Sets
//!
//! Fixed-capacity bitset of entity slot indices.
//!
//! One bit per slot, 64 slots per word: tracking 1M slots costs ~122KB.
//! Insert, remove and membership are O(1); iteration skips empty words with
//! `trailing_zeros`. The set never allocates after construction.

/// Set of entity slot indices bounded by the table capacity.
///
/// Query results handed to systems are `SlotSet`s; iteration order is
/// ascending slot index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotSet {
    /// Bitset: 1 = member. 64 slots per word.
    bits: Box<[u64]>,
    /// Capacity in slots.
    capacity: usize,
    /// Cached number of members.
    len: usize,
}

impl SlotSet {
    /// Creates an empty set able to hold indices `0..capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let word_count = capacity.div_ceil(64);
        Self {
            bits: vec![0u64; word_count].into_boxed_slice(),
            capacity,
            len: 0,
        }
    }

    /// Creates a set containing every index in `0..capacity`.
    #[must_use]
    pub fn full(capacity: usize) -> Self {
        let mut set = Self::new(capacity);
        let full_words = capacity / 64;
        for word in set.bits.iter_mut().take(full_words) {
            *word = u64::MAX;
        }
        let remaining = capacity % 64;
        if remaining > 0 {
            set.bits[full_words] = (1u64 << remaining) - 1;
        }
        set.len = capacity;
        set
    }

    /// Largest index + 1 this set can hold.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of members.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the set has no members.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Adds `index`. Returns `true` if it was not already present.
    ///
    /// Indices outside the capacity are ignored.
    #[inline]
    pub fn insert(&mut self, index: usize) -> bool {
        if index >= self.capacity {
            return false;
        }
        let mask = 1u64 << (index % 64);
        let word = &mut self.bits[index / 64];
        let was_absent = *word & mask == 0;
        *word |= mask;
        if was_absent {
            self.len += 1;
        }
        was_absent
    }

    /// Removes `index`. Returns `true` if it was present.
    #[inline]
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.capacity {
            return false;
        }
        let mask = 1u64 << (index % 64);
        let word = &mut self.bits[index / 64];
        let was_present = *word & mask != 0;
        *word &= !mask;
        if was_present {
            self.len -= 1;
        }
        was_present
    }

    /// Returns `true` if `index` is a member.
    #[inline]
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        if index >= self.capacity {
            return false;
        }
        (self.bits[index / 64] >> (index % 64)) & 1 == 1
    }

    /// Lowest member, if any.
    #[must_use]
    pub fn first(&self) -> Option<usize> {
        self.bits
            .iter()
            .enumerate()
            .find(|(_, word)| **word != 0)
            .map(|(word_idx, word)| word_idx * 64 + word.trailing_zeros() as usize)
    }

    /// Removes every member.
    pub fn clear(&mut self) {
        if self.len == 0 {
            return;
        }
        for word in self.bits.iter_mut() {
            *word = 0;
        }
        self.len = 0;
    }

    /// Overwrites `self` with the members of `other` without allocating.
    ///
    /// # Panics
    ///
    /// Panics if the two sets have different capacities.
    pub fn copy_from(&mut self, other: &Self) {
        assert_eq!(
            self.capacity, other.capacity,
            "slot sets must share a capacity"
        );
        self.bits.copy_from_slice(&other.bits);
        self.len = other.len;
    }

    /// Iterates members in ascending order.
    pub fn iter(&self) -> SlotIter<'_> {
        SlotIter {
            bits: &self.bits,
            word_idx: 0,
            current_word: self.bits.first().copied().unwrap_or(0),
        }
    }
}

impl<'a> IntoIterator for &'a SlotSet {
    type Item = usize;
    type IntoIter = SlotIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the members of a [`SlotSet`].
pub struct SlotIter<'a> {
    bits: &'a [u64],
    word_idx: usize,
    current_word: u64,
}

impl Iterator for SlotIter<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let bit = self.current_word.trailing_zeros() as usize;
                self.current_word &= self.current_word - 1;
                return Some(self.word_idx * 64 + bit);
            }

            self.word_idx += 1;
            if self.word_idx >= self.bits.len() {
                return None;
            }
            self.current_word = self.bits[self.word_idx];
        }
    }
}
