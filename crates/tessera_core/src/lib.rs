//! # Tessera Core
//!
//! Fixed-capacity Entity Component Store designed for:
//! - Index-based entities with 64-bit component masks
//! - System queries maintained incrementally, never by rescanning
//! - Zero allocations after construction
//!
//! ## Architecture Rules
//!
//! 1. **Capacity is fixed** - chosen up front, exhaustion is a hard error
//! 2. **Structural changes are deferred** - creation and destruction take
//!    effect at the start of the next tick
//! 3. **Component changes are immediate** - queries follow every mask change
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_core::{Store, StoreConfig};
//!
//! let store = Store::builder(StoreConfig::with_capacity(10_000))?
//!     .with_component::<Position>()?
//!     .with_system(MovementSystem)
//!     .build()?;
//!
//! let entity = store.create_entity((Position::default(),))?;
//! store.tick(0, 1.0 / 60.0)?; // entity is now alive and queried
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::StoreConfig;
pub use ecs::{
    Component, ComponentMask, ComponentRegistry, ComponentSet, ComponentStorage, EntityHook,
    EntitySlot, EntityState, EntityTable, FnSystem, Query, QueryDescriptor, SlotIter, SlotSet,
    Store, StoreBuilder, System, TableStats, TickStats,
};
pub use error::{EcsError, EcsResult, SystemError};
