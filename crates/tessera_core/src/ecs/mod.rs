//! # Entity Component Store
//!
//! A fixed-capacity, index-based ECS.
//!
//! ## Design Philosophy
//!
//! - All storage is pre-allocated when the store is built
//! - An entity is its slot index; the slot's 64-bit mask names its components
//! - Components are stored in dense arrays aligned with the slot table
//! - Every system query is kept current incrementally, one slot at a time

mod component;
mod entity;
mod mask;
mod query;
mod slot_set;
mod storage;
mod store;
mod system;
mod table;

pub use component::{Component, ComponentSet};
pub use entity::{EntitySlot, EntityState};
pub use mask::ComponentMask;
pub use query::{Query, QueryDescriptor};
pub use slot_set::{SlotIter, SlotSet};
pub use storage::{ComponentRegistry, ComponentStorage};
pub use store::{EntityHook, Store, StoreBuilder, TickStats};
pub use system::{FnSystem, System};
pub use table::{EntityTable, TableStats};
