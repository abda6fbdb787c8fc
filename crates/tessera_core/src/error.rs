//! # Store Error Types
//!
//! All errors that can occur while configuring, mutating or ticking a store.

use thiserror::Error;

use crate::ecs::{ComponentMask, EntityState};

/// Error type returned by a system's update.
pub type SystemError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in the entity component store.
#[derive(Error, Debug)]
pub enum EcsError {
    /// No empty slot left. Capacity is fixed at construction; destroy
    /// entities or configure a larger table.
    #[error("entity capacity reached: all {capacity} slots are occupied")]
    CapacityExceeded {
        /// Configured table capacity.
        capacity: usize,
    },

    /// Slot is not in the state the operation requires.
    #[error("entity {index} is {actual}, expected {expected}")]
    InvalidState {
        /// Slot index.
        index: usize,
        /// State the operation needs.
        expected: EntityState,
        /// State the slot was found in.
        actual: EntityState,
    },

    /// Slot index past the end of the table.
    #[error("entity index {index} out of bounds (capacity {capacity})")]
    IndexOutOfBounds {
        /// Offending index.
        index: usize,
        /// Configured table capacity.
        capacity: usize,
    },

    /// The same component kind was passed twice when creating an entity.
    #[error("component {id} given more than once for one entity")]
    DuplicateComponent {
        /// Component bit position.
        id: u8,
    },

    /// No storage bucket exists for this component type.
    #[error("component {type_name} (id {id}) is not registered")]
    UnregisteredComponent {
        /// Component bit position.
        id: u8,
        /// Rust type name of the component.
        type_name: &'static str,
    },

    /// Two component types claim the same bit.
    #[error("component id {id} is already registered")]
    ComponentIdConflict {
        /// Component bit position.
        id: u8,
    },

    /// A system both requires and excludes the same component kinds.
    #[error("system `{system}` both requires and excludes {overlap}")]
    ContradictoryQuery {
        /// Name of the offending system.
        system: String,
        /// Bits present in both masks.
        overlap: ComponentMask,
    },

    /// `tick` was called while the same thread was already inside a tick,
    /// from a system or a lifecycle hook.
    #[error("tick for frame {frame} requested from inside a running tick")]
    ReentrantTick {
        /// Frame passed to the rejected call.
        frame: u64,
    },

    /// Invalid store configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A system's update failed; the rest of that tick's system pass was
    /// skipped.
    #[error("system `{system}` failed on frame {frame}: {source}")]
    SystemFailed {
        /// Name of the failing system.
        system: String,
        /// Frame passed to the tick.
        frame: u64,
        /// Error returned by the system.
        source: SystemError,
    },
}

/// Result type for store operations.
pub type EcsResult<T> = Result<T, EcsError>;
