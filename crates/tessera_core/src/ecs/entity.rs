//! # Entity Slots
//!
//! An entity is nothing more than an index into the entity table. The slot
//! at that index carries a lifecycle state and the mask of attached
//! components. Once a slot cycles back to `Empty` and is reused, the same
//! index denotes a different entity.

use std::fmt;

use super::mask::ComponentMask;

/// Lifecycle of an entity slot.
///
/// ```text
/// Empty -> Creating -> Alive -> Destroying -> Empty
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntityState {
    /// Slot unused; eligible for creation.
    #[default]
    Empty,
    /// Reserved this tick; promoted to `Alive` by the next creation flush.
    Creating,
    /// Visible to queries according to its mask.
    Alive,
    /// Marked for removal; freed by the next destruction flush.
    Destroying,
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Creating => "creating",
            Self::Alive => "alive",
            Self::Destroying => "destroying",
        };
        f.write_str(name)
    }
}

/// One position of the entity table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntitySlot {
    /// Lifecycle state of this slot.
    pub state: EntityState,
    /// Components currently attached (up to 64 kinds).
    pub component_mask: ComponentMask,
}

impl EntitySlot {
    /// Creates an empty slot.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            state: EntityState::Empty,
            component_mask: ComponentMask::EMPTY,
        }
    }

    /// Checks if this slot is visible to queries.
    #[inline]
    #[must_use]
    pub const fn is_alive(self) -> bool {
        matches!(self.state, EntityState::Alive)
    }

    /// Checks if this slot can be handed out by `create_entity`.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        matches!(self.state, EntityState::Empty)
    }

    /// Checks if this slot has a specific component.
    ///
    /// # Arguments
    ///
    /// * `component_id` - The component bit position (0-63)
    #[inline]
    #[must_use]
    pub const fn has_component(self, component_id: u8) -> bool {
        self.component_mask.has(component_id)
    }
}
