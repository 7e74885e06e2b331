//! # Component Pools
//!
//! Pre-allocated, dense storage for one component type.
//!
//! ```text
//! slot:    0        1        2        3        4
//!        [ -- ] [ a:P ] [ b:P ] [ c:P ] [ free ]     total = 4
//!
//! remove(b):  c moves into slot 2, slot 3 is reset
//!        [ -- ] [ a:P ] [ c:P ] [ free ] [ free ]    total = 3
//! ```
//!
//! - Slot 0 is a sentinel and never holds a component
//! - Live components occupy `[1, total)` with no gaps
//! - Insert and remove are O(1); removal does not preserve order

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::mem;

use super::component::{Component, ComponentTypeId};
use super::entity::{Entity, EntityId};
use crate::error::{EcsError, EcsResult};

/// First occupied slot; slot 0 is a sentinel.
const FIRST_SLOT: usize = 1;

/// One slot of a pool: the value and the entity that owns it.
#[derive(Debug, Default)]
struct PoolEntry<T> {
    value: T,
    owner: Option<EntityId>,
}

/// Dense storage for a single component type.
///
/// All slots are allocated at creation; adding and removing components never
/// touches the allocator for the value array.
///
/// # Type Parameters
///
/// * `T` - The component type to store
///
/// # Example
///
/// ```rust,ignore
/// let mut pool: ComponentPool<Position> = ComponentPool::new(id, 256);
/// pool.add(&mut entity, Position::default())?;
/// pool.remove(&mut entity)?;
/// ```
pub struct ComponentPool<T: Component> {
    /// Type id whose signature bit this pool maintains.
    type_id: ComponentTypeId,
    /// `capacity + 1` entries; index 0 is never occupied.
    entries: Box<[PoolEntry<T>]>,
    /// Owner to slot, the exact inverse of `entries[1..total].owner`.
    entity_to_slot: HashMap<EntityId, usize>,
    /// Next free slot.
    total: usize,
}

impl<T: Component> ComponentPool<T> {
    /// Creates a pool holding up to `capacity` live components.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(type_id: ComponentTypeId, capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        let entries = (0..=capacity)
            .map(|_| PoolEntry::default())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            type_id,
            entries,
            entity_to_slot: HashMap::with_capacity(capacity),
            total: FIRST_SLOT,
        }
    }

    /// Returns the component type id this pool stores.
    #[inline]
    #[must_use]
    pub const fn type_id(&self) -> ComponentTypeId {
        self.type_id
    }

    /// Maximum number of live components.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.len() - FIRST_SLOT
    }

    /// Number of live components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.total - FIRST_SLOT
    }

    /// Checks whether the pool holds no component.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == FIRST_SLOT
    }

    /// Checks whether `id` owns a component in this pool.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entity_to_slot.contains_key(&id)
    }

    /// Returns the dense slot holding `id`'s component.
    #[inline]
    #[must_use]
    pub fn slot_of(&self, id: EntityId) -> Option<usize> {
        self.entity_to_slot.get(&id).copied()
    }

    /// Stores a component for `entity` and sets its signature bit.
    ///
    /// # Errors
    ///
    /// - [`EcsError::DuplicateComponent`] if the entity already has one here
    /// - [`EcsError::PoolFull`] if every slot is taken
    ///
    /// Nothing is modified when an error is returned.
    pub fn add(&mut self, entity: &mut Entity, value: T) -> EcsResult<&mut T> {
        let id = entity.id();
        if self.entity_to_slot.contains_key(&id) {
            return Err(EcsError::DuplicateComponent {
                entity: id,
                component: self.type_id,
            });
        }
        if self.total >= self.entries.len() {
            return Err(EcsError::PoolFull {
                component: self.type_id,
                capacity: self.capacity(),
            });
        }

        let slot = self.total;
        self.entity_to_slot.insert(id, slot);
        self.entries[slot].value = value;
        entity.signature_mut().set(self.type_id);
        self.entries[slot].owner = Some(id);
        self.total += 1;

        Ok(&mut self.entries[slot].value)
    }

    /// Gets `id`'s component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if `id` has no component here.
    pub fn get(&self, id: EntityId) -> EcsResult<&T> {
        let slot = self.lookup(id)?;
        Ok(&self.entries[slot].value)
    }

    /// Gets `id`'s component mutably, in place.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if `id` has no component here.
    pub fn get_mut(&mut self, id: EntityId) -> EcsResult<&mut T> {
        let slot = self.lookup(id)?;
        Ok(&mut self.entries[slot].value)
    }

    /// Removes `entity`'s component with swap-to-end compaction.
    ///
    /// The last live entry fills the vacated slot, so indices at or after the
    /// removed slot are invalidated. Removing the last slot swaps it with
    /// itself and then resets it, which is safe because the reset runs after
    /// the move.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if the entity has no component
    /// here. Nothing is modified in that case.
    pub fn remove(&mut self, entity: &mut Entity) -> EcsResult<T> {
        let id = entity.id();
        let slot = self.lookup(id)?;
        let last = self.total - 1;

        // Break the owner link before the slot is overwritten.
        self.entries[slot].owner = None;

        // The last live entry moves into the hole; the removed one lands at `last`.
        self.entries.swap(slot, last);

        // Leave nothing behind at the old end.
        let removed = mem::take(&mut self.entries[last]);

        self.total -= 1;
        if self.total > slot {
            if let Some(moved) = self.entries[slot].owner {
                self.entity_to_slot.insert(moved, slot);
            }
        }

        self.entity_to_slot.remove(&id);
        entity.signature_mut().clear(self.type_id);

        Ok(removed.value)
    }

    /// Iterates live components with their owners, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.live()
            .iter()
            .filter_map(|entry| entry.owner.map(|owner| (owner, &entry.value)))
    }

    /// Iterates live components mutably with their owners, in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        let total = self.total;
        self.entries[FIRST_SLOT..total]
            .iter_mut()
            .filter_map(|PoolEntry { value, owner }| owner.map(|owner| (owner, value)))
    }

    /// Owners of the live components, in slot order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.live().iter().filter_map(|entry| entry.owner)
    }

    #[inline]
    fn live(&self) -> &[PoolEntry<T>] {
        &self.entries[FIRST_SLOT..self.total]
    }

    #[inline]
    fn lookup(&self, id: EntityId) -> EcsResult<usize> {
        self.slot_of(id).ok_or(EcsError::ComponentNotFound {
            entity: id,
            component: self.type_id,
        })
    }
}

impl<T: Component> fmt::Display for ComponentPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pool {} ({}): {}/{} [",
            self.type_id,
            std::any::type_name::<T>(),
            self.len(),
            self.capacity()
        )?;
        for (i, owner) in self.entities().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{owner}")?;
        }
        write!(f, "]")
    }
}

/// Type-erased view of a pool.
///
/// Lets the world drop an entity's components by type id alone, and recover
/// the typed pool from the id-indexed slot.
pub trait ErasedPool {
    /// Component type stored in this pool.
    fn component_type(&self) -> ComponentTypeId;

    /// Number of live components.
    fn live_count(&self) -> usize;

    /// Checks whether `id` owns a component here.
    fn has_entity(&self, id: EntityId) -> bool;

    /// Removes and drops `entity`'s component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if the entity has none here.
    fn remove_entity(&mut self, entity: &mut Entity) -> EcsResult<()>;

    /// One-line summary for debug dumps.
    fn describe(&self) -> String;

    /// Upcast for typed recovery.
    fn as_any(&self) -> &dyn Any;

    /// Upcast for typed recovery.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedPool for ComponentPool<T> {
    fn component_type(&self) -> ComponentTypeId {
        self.type_id
    }

    fn live_count(&self) -> usize {
        self.len()
    }

    fn has_entity(&self, id: EntityId) -> bool {
        self.contains(id)
    }

    fn remove_entity(&mut self, entity: &mut Entity) -> EcsResult<()> {
        self.remove(entity).map(drop)
    }

    fn describe(&self) -> String {
        self.to_string()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
