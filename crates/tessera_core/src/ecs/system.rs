//! # Systems
//!
//! A system is per-tick logic over the slots its query matches. Systems are
//! handed to the store once, at construction, and run every tick in
//! registration order.

use super::query::QueryDescriptor;
use super::slot_set::SlotSet;
use crate::error::SystemError;
use crate::Store;

/// Per-tick logic bound to one query.
///
/// `update` receives the store so it can read and write component buckets
/// by index and request structural changes. Structural changes made here
/// follow the usual rules: component add/remove is visible to queries
/// immediately, creation and destruction wait for the next tick.
///
/// Storage guards may be held while reading entities. Release the guard on
/// a kind before calling a structural mutation that writes that kind.
pub trait System: Send {
    /// Name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Components an entity must have and must not have.
    fn query(&self) -> QueryDescriptor;

    /// Runs the system for one tick.
    ///
    /// `store.tick` must not be called from here; it returns
    /// [`EcsError::ReentrantTick`](crate::EcsError::ReentrantTick).
    ///
    /// # Errors
    ///
    /// Any error aborts the remaining system pass of this tick and is
    /// returned from [`Store::tick`].
    fn update(
        &mut self,
        store: &Store,
        frame: u64,
        delta_time: f32,
        entities: &SlotSet,
    ) -> Result<(), SystemError>;

    /// Called once when the store is dropped.
    fn shutdown(&mut self) {}
}

/// Adapts a closure into a [`System`].
///
/// # Example
///
/// ```rust,ignore
/// let gravity = FnSystem::new("gravity", QueryDescriptor::requiring(Velocity::MASK), |store, _, dt, entities| {
///     let mut velocities = store.components_mut::<Velocity>()?;
///     for index in entities {
///         velocities.as_mut_slice()[index].y -= 9.81 * dt;
///     }
///     Ok(())
/// });
/// ```
pub struct FnSystem<F> {
    name: String,
    query: QueryDescriptor,
    run: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&Store, u64, f32, &SlotSet) -> Result<(), SystemError> + Send,
{
    /// Wraps `run` as a system named `name` over `query`.
    pub fn new(name: impl Into<String>, query: QueryDescriptor, run: F) -> Self {
        Self {
            name: name.into(),
            query,
            run,
        }
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&Store, u64, f32, &SlotSet) -> Result<(), SystemError> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self) -> QueryDescriptor {
        self.query
    }

    fn update(
        &mut self,
        store: &Store,
        frame: u64,
        delta_time: f32,
        entities: &SlotSet,
    ) -> Result<(), SystemError> {
        (self.run)(store, frame, delta_time, entities)
    }
}
