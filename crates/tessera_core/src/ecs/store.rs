//! # Entity Component Store
//!
//! The store owns the entity table, the component buckets and one query per
//! system, and drives them through discrete ticks:
//!
//! ```text
//! tick(frame, dt):
//! ┌─────────────────────────────────────────────────────────────┐
//! │ 1. DESTRUCTION FLUSH                                        │
//! │    └─ Destroying -> Empty, pruned from every query, hook    │
//! │ 2. CREATION FLUSH                                           │
//! │    └─ Creating -> Alive, inserted where it matches, hook    │
//! │ 3. SYSTEM PASS                                              │
//! │    └─ each system, in registration order, with its query    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Destruction runs before creation so a slot freed this tick can be
//! re-created and promoted within the same tick.
//!
//! ## Locking
//!
//! Every entry point takes `&self` and may be called from any thread. Locks
//! are always taken in this order:
//!
//! ```text
//! runner (tick only) -> creation gate -> component bucket -> table -> query[i]
//! ```
//!
//! A system may hold bucket guards and still read the table, so nothing
//! takes a bucket while holding the table. A mask change holds the table
//! lock while it re-evaluates every query, so no query ever observes a stale
//! mask. `create_entity` reserves under the table lock and writes its
//! components after releasing it, inside a shared hold of the creation gate;
//! the creation flush takes the gate exclusively, so it never promotes a
//! slot whose components are still being written. Only the ticking thread
//! takes the gate exclusively, and never during the system pass, so a system
//! holding bucket guards can still create entities.
//!
//! Systems receive a copy of their matching set taken under the query lock;
//! no store lock other than the runner is held while a system or a lifecycle
//! hook runs. The runner is not re-entrant: `tick` called from inside a tick
//! on the same thread fails with [`EcsError::ReentrantTick`].

use std::thread::{self, ThreadId};

use parking_lot::{MappedRwLockReadGuard, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::component::{Component, ComponentSet};
use super::entity::EntitySlot;
use super::mask::ComponentMask;
use super::query::{Query, QueryDescriptor};
use super::slot_set::SlotSet;
use super::storage::{ComponentRegistry, ComponentStorage};
use super::system::System;
use super::table::{EntityTable, TableStats};
use crate::config::StoreConfig;
use crate::error::{EcsError, EcsResult};

/// Lifecycle notification: receives the store and the slot index.
pub type EntityHook = Box<dyn Fn(&Store, usize) + Send + Sync>;

/// Counters for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Frame passed to the tick.
    pub frame: u64,
    /// Slots freed by the destruction flush.
    pub destroyed: usize,
    /// Slots promoted by the creation flush.
    pub created: usize,
    /// Systems that ran to completion.
    pub systems_run: usize,
}

/// Systems plus the scratch sets a tick reuses; locked for a whole tick.
struct Runner {
    systems: Vec<Box<dyn System>>,
    /// Slots touched by the current flush phase.
    flushed: SlotSet,
    /// Copy of the running system's matching set.
    view: SlotSet,
}

/// Records the thread running a tick; cleared on drop, unwinding included.
struct TickingThread<'a>(&'a Mutex<Option<ThreadId>>);

impl<'a> TickingThread<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>, thread: ThreadId) -> Self {
        *slot.lock() = Some(thread);
        Self(slot)
    }
}

impl Drop for TickingThread<'_> {
    fn drop(&mut self) {
        *self.0.lock() = None;
    }
}

/// Builder for a [`Store`].
///
/// # Example
///
/// ```rust,ignore
/// let store = Store::builder(StoreConfig::with_capacity(1024))?
///     .with_component::<Position>()?
///     .with_component::<Velocity>()?
///     .with_system(MovementSystem)
///     .on_entity_created(|_, index| tracing::debug!("spawned {index}"))
///     .build()?;
/// ```
pub struct StoreBuilder {
    config: StoreConfig,
    components: ComponentRegistry,
    systems: Vec<Box<dyn System>>,
    on_created: Option<EntityHook>,
    on_destroyed: Option<EntityHook>,
}

impl StoreBuilder {
    /// Starts a builder for `config`.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if the config does not validate.
    pub fn new(config: StoreConfig) -> EcsResult<Self> {
        config.validate()?;
        let components = ComponentRegistry::new(config.entities_capacity);
        Ok(Self {
            config,
            components,
            systems: Vec::new(),
            on_created: None,
            on_destroyed: None,
        })
    }

    /// Allocates storage for component kind `C`.
    ///
    /// # Errors
    ///
    /// [`EcsError::ComponentIdConflict`] if another kind owns the bit.
    pub fn with_component<C: Component>(mut self) -> EcsResult<Self> {
        self.components.register::<C>()?;
        Ok(self)
    }

    /// Appends a system. Systems run in the order they are added.
    #[must_use]
    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    /// Appends an already boxed system.
    #[must_use]
    pub fn with_boxed_system(mut self, system: Box<dyn System>) -> Self {
        self.systems.push(system);
        self
    }

    /// Called for each slot promoted to alive by a creation flush.
    #[must_use]
    pub fn on_entity_created(mut self, hook: impl Fn(&Store, usize) + Send + Sync + 'static) -> Self {
        self.on_created = Some(Box::new(hook));
        self
    }

    /// Called for each slot freed by a destruction flush.
    #[must_use]
    pub fn on_entity_destroyed(
        mut self,
        hook: impl Fn(&Store, usize) + Send + Sync + 'static,
    ) -> Self {
        self.on_destroyed = Some(Box::new(hook));
        self
    }

    /// Builds the store.
    ///
    /// # Errors
    ///
    /// [`EcsError::ContradictoryQuery`] if a system requires and excludes
    /// the same component kind.
    pub fn build(self) -> EcsResult<Store> {
        let capacity = self.config.entities_capacity;

        let mut queries = Vec::with_capacity(self.systems.len());
        for system in &self.systems {
            let descriptor = system.query();
            let overlap = descriptor.contradiction();
            if !overlap.is_empty() {
                return Err(EcsError::ContradictoryQuery {
                    system: system.name().to_owned(),
                    overlap,
                });
            }
            queries.push(RwLock::new(Query::new(descriptor, capacity)));
        }

        tracing::info!(
            "Store built: capacity {}, {} component kinds, {} systems",
            capacity,
            self.components.registered().count(),
            self.systems.len()
        );

        Ok(Store {
            config: self.config,
            table: RwLock::new(EntityTable::new(capacity)),
            queries: queries.into_boxed_slice(),
            components: self.components,
            creation_gate: RwLock::new(()),
            runner: Mutex::new(Runner {
                systems: self.systems,
                flushed: SlotSet::new(capacity),
                view: SlotSet::new(capacity),
            }),
            ticking_on: Mutex::new(None),
            on_created: self.on_created,
            on_destroyed: self.on_destroyed,
        })
    }
}

/// Fixed-capacity entity component store.
///
/// All memory is allocated when the store is built. Creating, destroying
/// and re-tagging entities never allocates.
pub struct Store {
    config: StoreConfig,
    table: RwLock<EntityTable>,
    queries: Box<[RwLock<Query>]>,
    components: ComponentRegistry,
    /// Shared by `create_entity` while it writes components, exclusive for
    /// the creation flush.
    creation_gate: RwLock<()>,
    runner: Mutex<Runner>,
    /// Thread inside `tick`, if any.
    ticking_on: Mutex<Option<ThreadId>>,
    on_created: Option<EntityHook>,
    on_destroyed: Option<EntityHook>,
}

impl Store {
    /// Starts building a store.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if the config does not validate.
    pub fn builder(config: StoreConfig) -> EcsResult<StoreBuilder> {
        StoreBuilder::new(config)
    }

    /// Configuration the store was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of entity slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.config.entities_capacity
    }

    /// Number of registered systems, which is also the number of queries.
    #[inline]
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.queries.len()
    }

    // =========================================================================
    // Structural mutations
    // =========================================================================

    /// Reserves the lowest empty slot for an entity with `components`.
    ///
    /// The slot is `Creating` until the next tick promotes it; until then no
    /// query sees it.
    ///
    /// # Errors
    ///
    /// - [`EcsError::CapacityExceeded`] if every slot is occupied
    /// - [`EcsError::DuplicateComponent`] if a kind is given twice
    /// - [`EcsError::UnregisteredComponent`] if a kind has no storage
    pub fn create_entity<S: ComponentSet>(&self, components: S) -> EcsResult<usize> {
        let mask = S::mask()?;
        S::ensure(&self.components)?;

        let _gate = self.creation_gate.read();
        let index = self.table.write().reserve(mask).map_err(|err| {
            tracing::warn!("Entity creation rejected: {}", err);
            err
        })?;
        // Table released: a Creating slot is invisible to queries, and the
        // gate keeps the creation flush out until the write is done.
        components.write(&self.components, index)?;

        tracing::trace!("Entity {} reserved with mask {}", index, mask);
        Ok(index)
    }

    /// Marks an alive entity for destruction at the next tick.
    ///
    /// The entity keeps its slot and query memberships until then. Marking
    /// an entity that is already `Destroying` does nothing.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidState`] for empty or still-creating slots,
    /// [`EcsError::IndexOutOfBounds`] past the capacity.
    pub fn destroy_entity(&self, index: usize) -> EcsResult<()> {
        let marked = self.table.write().mark_destroying(index).map_err(|err| {
            tracing::warn!("Entity destruction rejected: {}", err);
            err
        })?;
        if marked {
            tracing::trace!("Entity {} marked for destruction", index);
        }
        Ok(())
    }

    /// Attaches `component` to an alive entity.
    ///
    /// Query memberships change immediately. Returns `false` without
    /// touching storage if the entity already has this kind.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidState`] if the entity is not alive,
    /// [`EcsError::UnregisteredComponent`] if `C` has no storage.
    ///
    /// Blocks while any guard on `C`'s storage is held, so a system must
    /// release its guard on `C` before attaching `C`.
    pub fn add_component<C: Component>(&self, index: usize, component: C) -> EcsResult<bool> {
        let mut storage = self.components.write::<C>()?;

        let mut table = self.table.write();
        let Some(mask) = table
            .update_mask(index, C::MASK, true)
            .map_err(Self::log_rejected)?
        else {
            return Ok(false);
        };
        // update_mask validated the index.
        storage.set(index, component);
        self.reevaluate(index, mask);
        drop(table);
        drop(storage);
        Ok(true)
    }

    /// Detaches component kind `C` from an alive entity.
    ///
    /// Query memberships change immediately; the stored value is left in
    /// place and ignored. Returns `false` if the entity did not have it.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidState`] if the entity is not alive,
    /// [`EcsError::UnregisteredComponent`] if `C` has no storage.
    pub fn remove_component<C: Component>(&self, index: usize) -> EcsResult<bool> {
        self.components.ensure::<C>()?;

        let mut table = self.table.write();
        let Some(mask) = table
            .update_mask(index, C::MASK, false)
            .map_err(Self::log_rejected)?
        else {
            return Ok(false);
        };
        self.reevaluate(index, mask);
        drop(table);
        Ok(true)
    }

    fn log_rejected(err: EcsError) -> EcsError {
        tracing::warn!("Component change rejected: {}", err);
        err
    }

    /// Re-evaluates one alive slot in every query. Caller holds the table
    /// write lock.
    fn reevaluate(&self, index: usize, mask: ComponentMask) {
        for query in self.queries.iter() {
            query.write().reevaluate(index, mask);
        }
    }

    /// Removes one slot from every query. Caller holds the table write lock.
    fn evict(&self, index: usize) {
        for query in self.queries.iter() {
            query.write().evict(index);
        }
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// Read guard over the raw slot array.
    ///
    /// Mutations block while the guard is held; keep it short.
    pub fn entities(&self) -> MappedRwLockReadGuard<'_, [EntitySlot]> {
        RwLockReadGuard::map(self.table.read(), EntityTable::slots)
    }

    /// Copy of the slot at `index`.
    ///
    /// # Errors
    ///
    /// [`EcsError::IndexOutOfBounds`] past the capacity.
    pub fn entity(&self, index: usize) -> EcsResult<EntitySlot> {
        self.table.read().slot(index)
    }

    /// Returns `true` if the slot's mask includes `C`, whatever its state.
    ///
    /// # Errors
    ///
    /// [`EcsError::IndexOutOfBounds`] past the capacity.
    pub fn has_component<C: Component>(&self, index: usize) -> EcsResult<bool> {
        Ok(self.entity(index)?.has_component(C::ID))
    }

    /// Slot counts per lifecycle state.
    #[must_use]
    pub fn stats(&self) -> TableStats {
        self.table.read().stats()
    }

    /// Shared access to the storage of `C`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `C` has no storage.
    pub fn components<C: Component>(&self) -> EcsResult<RwLockReadGuard<'_, ComponentStorage<C>>> {
        self.components.read::<C>()
    }

    /// Exclusive access to the storage of `C`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `C` has no storage.
    pub fn components_mut<C: Component>(
        &self,
    ) -> EcsResult<RwLockWriteGuard<'_, ComponentStorage<C>>> {
        self.components.write::<C>()
    }

    /// Filter of the query owned by system `system`.
    #[must_use]
    pub fn query_descriptor(&self, system: usize) -> Option<QueryDescriptor> {
        self.queries.get(system).map(|query| query.read().descriptor())
    }

    /// Snapshot of the slots matched by system `system`, ascending.
    #[must_use]
    pub fn matching_entities(&self, system: usize) -> Option<Vec<usize>> {
        self.queries
            .get(system)
            .map(|query| query.read().matching().iter().collect())
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Runs one tick: destruction flush, creation flush, then every system.
    ///
    /// Ticks are serialised; structural mutations from other threads
    /// interleave between the phases.
    ///
    /// # Errors
    ///
    /// - [`EcsError::InvalidState`] if a pending creation was corrupted; the
    ///   system pass is skipped
    /// - [`EcsError::SystemFailed`] if a system returns an error; later
    ///   systems do not run this tick
    /// - [`EcsError::ReentrantTick`] if called from a system or hook of a
    ///   tick already running on this thread
    pub fn tick(&self, frame: u64, delta_time: f32) -> EcsResult<TickStats> {
        let current = thread::current().id();
        if *self.ticking_on.lock() == Some(current) {
            tracing::error!("Tick {} requested from inside a running tick", frame);
            return Err(EcsError::ReentrantTick { frame });
        }

        let mut runner = self.runner.lock();
        let _ticking = TickingThread::enter(&self.ticking_on, current);
        self.run_tick(&mut runner, frame, delta_time)
    }

    fn run_tick(&self, runner: &mut Runner, frame: u64, delta_time: f32) -> EcsResult<TickStats> {
        let Runner {
            systems,
            flushed,
            view,
        } = runner;
        let mut stats = TickStats {
            frame,
            ..TickStats::default()
        };

        tracing::trace!("Tick {} begin (dt {})", frame, delta_time);

        stats.destroyed = self.flush_destroyed(flushed);
        let (created, promotion) = self.flush_created(flushed);
        stats.created = created;
        if let Err(err) = promotion {
            tracing::error!("Creation flush failed on frame {}: {}", frame, err);
            return Err(err);
        }

        if stats.destroyed > 0 || stats.created > 0 {
            tracing::debug!(
                "Frame {}: {} entities destroyed, {} created",
                frame,
                stats.destroyed,
                stats.created
            );
        }

        for (query, system) in self.queries.iter().zip(systems.iter_mut()) {
            view.copy_from(query.read().matching());
            tracing::trace!("System `{}`: {} entities", system.name(), view.len());

            if let Err(source) = system.update(self, frame, delta_time, view) {
                tracing::error!("System `{}` failed on frame {}: {}", system.name(), frame, source);
                return Err(EcsError::SystemFailed {
                    system: system.name().to_owned(),
                    frame,
                    source,
                });
            }
            stats.systems_run += 1;
        }

        Ok(stats)
    }

    /// Frees every `Destroying` slot, prunes it from all queries and fires
    /// the destroyed hook. Returns how many slots were freed.
    fn flush_destroyed(&self, flushed: &mut SlotSet) -> usize {
        {
            let mut table = self.table.write();
            table.release_destroying(flushed);
            for index in &*flushed {
                self.evict(index);
            }
        }

        if let Some(hook) = &self.on_destroyed {
            for index in &*flushed {
                hook(self, index);
            }
        }
        flushed.len()
    }

    /// Promotes every pending `Creating` slot, inserts it into the queries
    /// it matches and fires the created hook. Slots promoted before a
    /// corrupted entry are still announced.
    fn flush_created(&self, flushed: &mut SlotSet) -> (usize, EcsResult<()>) {
        let promotion = {
            let _gate = self.creation_gate.write();
            let mut table = self.table.write();
            let promotion = table.promote_creating(flushed);
            for index in &*flushed {
                let mask = table.slots()[index].component_mask;
                self.reevaluate(index, mask);
            }
            promotion
        };

        if let Some(hook) = &self.on_created {
            for index in &*flushed {
                hook(self, index);
            }
        }
        (flushed.len(), promotion)
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        for system in &mut self.runner.get_mut().systems {
            system.shutdown();
        }
    }
}
