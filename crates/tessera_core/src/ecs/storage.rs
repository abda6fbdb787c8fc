//! # Component Buckets
//!
//! Every registered component kind gets one array sized to the table
//! capacity, positionally aligned with the entity table: the component of
//! slot `i` lives at index `i`. Entries are overwritten in place when a
//! component is attached and left stale when it is removed; the slot's mask
//! decides whether an entry is meaningful.

use std::any::{type_name, Any};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::component::Component;
use super::mask::ComponentMask;
use super::slot_set::SlotSet;
use crate::error::{EcsError, EcsResult};

/// Dense array of one component kind, one entry per entity slot.
///
/// Entries exist for every slot whether or not the slot carries the
/// component. Reading a slot the mask says is absent yields whatever was
/// last written there (or the default).
///
/// ```rust,ignore
/// let mut health: ComponentStorage<Health> = ComponentStorage::new(1024);
/// health.set(7, Health { current: 50.0, max: 100.0 });
/// ```
pub struct ComponentStorage<C: Component> {
    data: Box<[C]>,
}

impl<C: Component> ComponentStorage<C> {
    /// Allocates `capacity` default-valued entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![C::default(); capacity].into_boxed_slice(),
        }
    }

    /// Number of entries, equal to the table capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Entry of slot `index`; `None` past the capacity.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&C> {
        self.data.get(index)
    }

    /// Mutable entry of slot `index`.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut C> {
        self.data.get_mut(index)
    }

    /// Overwrites the entry of slot `index` in place. Returns `false` past
    /// the capacity.
    #[inline]
    pub fn set(&mut self, index: usize, component: C) -> bool {
        match self.data.get_mut(index) {
            Some(entry) => {
                *entry = component;
                true
            }
            None => false,
        }
    }

    /// All entries, indexed by slot.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[C] {
        &self.data
    }

    /// All entries, mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [C] {
        &mut self.data
    }

    /// Pairs each slot of `slots` with its entry, typically a system's
    /// matching entities.
    pub fn iter_slots<'a>(&'a self, slots: &'a SlotSet) -> impl Iterator<Item = (usize, &'a C)> {
        slots
            .iter()
            .filter_map(move |index| self.data.get(index).map(|c| (index, c)))
    }
}

/// Storage buckets for every registered component kind, indexed by bit.
///
/// The mapping from bit position to concrete type is fixed when the store
/// is built. Each bucket has its own lock so systems can hold one kind
/// mutably while reading another.
pub struct ComponentRegistry {
    /// One optional bucket per bit; each holds `RwLock<ComponentStorage<C>>`.
    buckets: [Option<Box<dyn Any + Send + Sync>>; 64],
    /// Bits that have a bucket.
    registered: ComponentMask,
    /// Entity table capacity every bucket is sized to.
    capacity: usize,
}

impl ComponentRegistry {
    /// Creates a registry with no buckets.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buckets: std::array::from_fn(|_| None),
            registered: ComponentMask::EMPTY,
            capacity,
        }
    }

    /// Allocates the bucket for `C`.
    ///
    /// # Errors
    ///
    /// [`EcsError::ComponentIdConflict`] if the bit is already taken.
    pub fn register<C: Component>(&mut self) -> EcsResult<()> {
        if self.registered.intersects(C::MASK) {
            return Err(EcsError::ComponentIdConflict { id: C::ID });
        }
        let bucket: Box<dyn Any + Send + Sync> =
            Box::new(RwLock::new(ComponentStorage::<C>::new(self.capacity)));
        self.buckets[usize::from(C::ID)] = Some(bucket);
        self.registered |= C::MASK;
        Ok(())
    }

    /// Bits that have a bucket.
    #[inline]
    #[must_use]
    pub const fn registered(&self) -> ComponentMask {
        self.registered
    }

    /// Number of slots in every bucket.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn bucket<C: Component>(&self) -> EcsResult<&RwLock<ComponentStorage<C>>> {
        // An ID past the last bucket can never have been registered.
        self.buckets
            .get(usize::from(C::ID))
            .and_then(Option::as_ref)
            .and_then(|bucket| bucket.downcast_ref::<RwLock<ComponentStorage<C>>>())
            .ok_or(EcsError::UnregisteredComponent {
                id: C::ID,
                type_name: type_name::<C>(),
            })
    }

    /// Checks that `C` owns a bucket.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] otherwise, including when another
    /// type registered the same bit.
    pub fn ensure<C: Component>(&self) -> EcsResult<()> {
        self.bucket::<C>().map(|_| ())
    }

    /// Shared access to the storage of `C`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `C` has no bucket.
    pub fn read<C: Component>(&self) -> EcsResult<RwLockReadGuard<'_, ComponentStorage<C>>> {
        Ok(self.bucket::<C>()?.read())
    }

    /// Exclusive access to the storage of `C`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `C` has no bucket.
    pub fn write<C: Component>(&self) -> EcsResult<RwLockWriteGuard<'_, ComponentStorage<C>>> {
        Ok(self.bucket::<C>()?.write())
    }

    /// Overwrites the component of slot `index`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `C` has no bucket,
    /// [`EcsError::IndexOutOfBounds`] if `index` is past the capacity.
    pub fn store<C: Component>(&self, index: usize, component: C) -> EcsResult<()> {
        if self.bucket::<C>()?.write().set(index, component) {
            Ok(())
        } else {
            Err(EcsError::IndexOutOfBounds {
                index,
                capacity: self.capacity,
            })
        }
    }
}
