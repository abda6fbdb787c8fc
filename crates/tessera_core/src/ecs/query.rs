//! # Queries
//!
//! A query is a system's subscription: the components an entity must have,
//! the components it must not have, and the live set of alive slots that
//! currently satisfy both.
//!
//! Queries are never rebuilt by scanning the table. Every mask-affecting
//! event re-evaluates only the affected slot, so the cost of an event is
//! O(systems), not O(entities).

use super::mask::ComponentMask;
use super::slot_set::SlotSet;

/// Required/excluded filter of a query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct QueryDescriptor {
    /// Bits that must all be present.
    pub required: ComponentMask,
    /// Bits that must all be absent.
    pub excluded: ComponentMask,
}

impl QueryDescriptor {
    /// Creates a filter from required and excluded masks.
    #[inline]
    #[must_use]
    pub const fn new(required: ComponentMask, excluded: ComponentMask) -> Self {
        Self { required, excluded }
    }

    /// Filter that only requires components.
    #[inline]
    #[must_use]
    pub const fn requiring(required: ComponentMask) -> Self {
        Self::new(required, ComponentMask::EMPTY)
    }

    /// Returns `true` if a slot with `mask` satisfies the filter.
    #[inline]
    #[must_use]
    pub const fn matches(&self, mask: ComponentMask) -> bool {
        mask.contains_all(self.required) && !mask.intersects(self.excluded)
    }

    /// Bits both required and excluded. A non-empty overlap makes the query
    /// unsatisfiable.
    #[inline]
    #[must_use]
    pub fn contradiction(&self) -> ComponentMask {
        self.required & self.excluded
    }
}

/// A filter plus the alive slots it currently matches.
#[derive(Clone, Debug)]
pub struct Query {
    descriptor: QueryDescriptor,
    matching: SlotSet,
}

impl Query {
    /// Creates an empty query over a table of `capacity` slots.
    #[must_use]
    pub fn new(descriptor: QueryDescriptor, capacity: usize) -> Self {
        Self {
            descriptor,
            matching: SlotSet::new(capacity),
        }
    }

    /// The filter of this query.
    #[inline]
    #[must_use]
    pub const fn descriptor(&self) -> QueryDescriptor {
        self.descriptor
    }

    /// Alive slots currently matching.
    #[inline]
    #[must_use]
    pub const fn matching(&self) -> &SlotSet {
        &self.matching
    }

    /// Re-evaluates slot `index` against its current `mask`.
    ///
    /// Inserts the index if it matches and removes it otherwise; both are
    /// idempotent. The caller guarantees the slot is alive. Returns `true`
    /// if membership changed.
    #[inline]
    pub fn reevaluate(&mut self, index: usize, mask: ComponentMask) -> bool {
        if self.descriptor.matches(mask) {
            self.matching.insert(index)
        } else {
            self.matching.remove(index)
        }
    }

    /// Drops slot `index` because it left the alive state.
    #[inline]
    pub fn evict(&mut self, index: usize) -> bool {
        self.matching.remove(index)
    }
}
