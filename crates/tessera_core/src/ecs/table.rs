//! # Entity Table
//!
//! The fixed array of entity slots plus the bookkeeping sets that let the
//! flush phases run in O(pending) instead of O(capacity):
//!
//! ```text
//! vacant      every Empty slot (lowest is handed out first)
//! creating    slots reserved since the last creation flush
//! destroying  slots marked since the last destruction flush
//! ```
//!
//! The table knows nothing about queries; the store pairs every mask change
//! here with a query re-evaluation under the same lock.

use super::entity::{EntitySlot, EntityState};
use super::mask::ComponentMask;
use super::slot_set::SlotSet;
use crate::error::{EcsError, EcsResult};

/// Slot counts per lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableStats {
    /// Slots with no occupant.
    pub vacant: usize,
    /// Slots waiting for the creation flush.
    pub creating: usize,
    /// Slots visible to queries.
    pub alive: usize,
    /// Slots waiting for the destruction flush.
    pub destroying: usize,
}

/// Fixed-capacity table of entity slots.
pub struct EntityTable {
    slots: Box<[EntitySlot]>,
    vacant: SlotSet,
    creating: SlotSet,
    destroying: SlotSet,
}

impl EntityTable {
    /// Creates a table with every slot empty.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![EntitySlot::empty(); capacity].into_boxed_slice(),
            vacant: SlotSet::full(capacity),
            creating: SlotSet::new(capacity),
            destroying: SlotSet::new(capacity),
        }
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Every slot, indexed by entity.
    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[EntitySlot] {
        &self.slots
    }

    /// Slot at `index`.
    ///
    /// # Errors
    ///
    /// [`EcsError::IndexOutOfBounds`] if `index` is past the capacity.
    pub fn slot(&self, index: usize) -> EcsResult<EntitySlot> {
        self.slots
            .get(index)
            .copied()
            .ok_or(EcsError::IndexOutOfBounds {
                index,
                capacity: self.slots.len(),
            })
    }

    /// Counts slots per state.
    #[must_use]
    pub fn stats(&self) -> TableStats {
        let vacant = self.vacant.len();
        let creating = self.creating.len();
        let destroying = self.destroying.len();
        TableStats {
            vacant,
            creating,
            alive: self.slots.len() - vacant - creating - destroying,
            destroying,
        }
    }

    /// Reserves the lowest empty slot with `mask` and marks it `Creating`.
    ///
    /// # Errors
    ///
    /// [`EcsError::CapacityExceeded`] if no slot is empty.
    pub fn reserve(&mut self, mask: ComponentMask) -> EcsResult<usize> {
        let index = self.vacant.first().ok_or(EcsError::CapacityExceeded {
            capacity: self.slots.len(),
        })?;
        self.vacant.remove(index);
        self.creating.insert(index);
        self.slots[index] = EntitySlot {
            state: EntityState::Creating,
            component_mask: mask,
        };
        Ok(index)
    }

    /// Marks an alive slot `Destroying`.
    ///
    /// Returns `false` if it was already marked.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidState`] for empty or creating slots.
    pub fn mark_destroying(&mut self, index: usize) -> EcsResult<bool> {
        match self.slot(index)?.state {
            EntityState::Alive => {
                self.slots[index].state = EntityState::Destroying;
                self.destroying.insert(index);
                Ok(true)
            }
            EntityState::Destroying => Ok(false),
            actual => Err(EcsError::InvalidState {
                index,
                expected: EntityState::Alive,
                actual,
            }),
        }
    }

    /// Sets or clears the bits of `component` on an alive slot.
    ///
    /// Returns the new mask, or `None` when the slot already was in the
    /// requested shape.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidState`] if the slot is not alive.
    pub fn update_mask(
        &mut self,
        index: usize,
        component: ComponentMask,
        attach: bool,
    ) -> EcsResult<Option<ComponentMask>> {
        let slot = self.slot(index)?;
        if !slot.is_alive() {
            return Err(EcsError::InvalidState {
                index,
                expected: EntityState::Alive,
                actual: slot.state,
            });
        }

        let current = slot.component_mask;
        let updated = if attach {
            current | component
        } else {
            current & !component
        };
        if updated == current {
            return Ok(None);
        }
        self.slots[index].component_mask = updated;
        Ok(Some(updated))
    }

    /// Frees every `Destroying` slot: state `Empty`, mask cleared, index
    /// vacant again. The freed indices are written to `freed`.
    pub fn release_destroying(&mut self, freed: &mut SlotSet) {
        freed.copy_from(&self.destroying);
        for index in &self.destroying {
            self.slots[index] = EntitySlot::empty();
            self.vacant.insert(index);
        }
        self.destroying.clear();
    }

    /// Promotes every pending `Creating` slot to `Alive`. The promoted
    /// indices are written to `promoted`.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidState`] for the first pending index that is no
    /// longer `Creating`. Such slots are skipped; every other pending slot
    /// is still promoted and the pending set is cleared.
    pub fn promote_creating(&mut self, promoted: &mut SlotSet) -> EcsResult<()> {
        promoted.clear();
        let mut outcome = Ok(());
        for index in &self.creating {
            let slot = &mut self.slots[index];
            if slot.state != EntityState::Creating {
                if outcome.is_ok() {
                    outcome = Err(EcsError::InvalidState {
                        index,
                        expected: EntityState::Creating,
                        actual: slot.state,
                    });
                }
                continue;
            }
            slot.state = EntityState::Alive;
            promoted.insert(index);
        }
        self.creating.clear();
        outcome
    }
}
