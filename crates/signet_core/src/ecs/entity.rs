//! # Entity Management
//!
//! Entities are bare identifiers plus a signature of the component types they
//! currently hold. The [`EntityRegistry`] is the only owner of an entity's
//! existence; pools and systems refer to entities by [`EntityId`] alone.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::component::ComponentTypeId;
use super::signature::Signature;
use crate::config::MAX_ENTITIES;
use crate::error::{EcsError, EcsResult};

/// Search windows this small are scanned linearly instead of bisected.
pub const LINEAR_SEARCH_THRESHOLD: usize = 5;

/// Process-wide id counter. Ids are never recycled.
static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for an entity.
///
/// Ids increase monotonically across the whole process and are never reused,
/// even after the entity is destroyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Allocates the next process-unique id.
    #[inline]
    fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A live entity and the set of component types attached to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    /// The unique identifier for this entity.
    id: EntityId,
    /// Bit `i` is set iff a live component with type id `i` is attached.
    signature: Signature,
    /// Whether [`World::clear`](crate::World::clear) destroys this entity.
    destroy_on_clear: bool,
}

impl Entity {
    fn new(id: EntityId) -> Self {
        Self {
            id,
            signature: Signature::EMPTY,
            destroy_on_clear: true,
        }
    }

    /// Returns the entity's id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the set of component types currently attached.
    #[inline]
    #[must_use]
    pub const fn signature(&self) -> Signature {
        self.signature
    }

    /// Checks if this entity has a component of the given type.
    #[inline]
    #[must_use]
    pub const fn has_component(&self, component: ComponentTypeId) -> bool {
        self.signature.test(component)
    }

    /// Whether a bulk clear destroys this entity.
    #[inline]
    #[must_use]
    pub const fn destroy_on_clear(&self) -> bool {
        self.destroy_on_clear
    }

    /// Sets whether a bulk clear destroys this entity.
    #[inline]
    pub fn set_destroy_on_clear(&mut self, destroy: bool) {
        self.destroy_on_clear = destroy;
    }

    /// Signature bookkeeping is owned by pools and the registry.
    #[inline]
    pub(crate) fn signature_mut(&mut self) -> &mut Signature {
        &mut self.signature
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}) signature {}", self.id, self.signature)
    }
}

/// Owns every live entity, sorted by id.
///
/// Ids are handed out in increasing order and appended, so the collection
/// stays sorted without any re-sorting; removal preserves order.
#[derive(Debug)]
pub struct EntityRegistry {
    entities: Vec<Entity>,
}

impl EntityRegistry {
    /// Creates a registry reserving room for `reserve` entities.
    ///
    /// The reservation is a starting size, not a ceiling.
    #[must_use]
    pub fn new(reserve: usize) -> Self {
        Self {
            entities: Vec::with_capacity(reserve),
        }
    }

    /// Allocates a new entity with an empty signature.
    ///
    /// New entities are destroyed by bulk clears unless told otherwise.
    pub fn create(&mut self) -> EntityId {
        let id = EntityId::next();
        self.entities.push(Entity::new(id));
        id
    }

    /// Gets an entity by id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if no live entity has this id.
    pub fn get(&self, id: EntityId) -> EcsResult<&Entity> {
        let index = self.position(id).ok_or(EcsError::EntityNotFound(id))?;
        Ok(&self.entities[index])
    }

    /// Gets a mutable entity by id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if no live entity has this id.
    pub fn get_mut(&mut self, id: EntityId) -> EcsResult<&mut Entity> {
        let index = self.position(id).ok_or(EcsError::EntityNotFound(id))?;
        Ok(&mut self.entities[index])
    }

    /// Checks whether an entity with this id is alive.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.position(id).is_some()
    }

    /// Erases an entity, returning its final record.
    ///
    /// Components and system interest must already be detached; the registry
    /// does not touch pools or systems.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the id is not alive, including
    /// when it was already removed.
    pub fn remove(&mut self, id: EntityId) -> EcsResult<Entity> {
        let index = self.position(id).ok_or(EcsError::EntityNotFound(id))?;
        Ok(self.entities.remove(index))
    }

    /// Clears one component bit in an entity's signature.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the id is not alive.
    pub fn remove_component_bit(&mut self, id: EntityId, component: ComponentTypeId) -> EcsResult<()> {
        self.get_mut(id)?.signature_mut().clear(component);
        Ok(())
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Checks whether no entity is alive.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity at a dense index, for index-stable reverse walks.
    #[inline]
    pub(crate) fn at(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    /// Iterates live entities in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Iterates live entity ids in ascending order.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = EntityId> + '_ {
        self.entities.iter().map(Entity::id)
    }

    /// Hybrid search: bisect while the window is wide, scan once it is narrow.
    fn position(&self, id: EntityId) -> Option<usize> {
        let mut low = 0;
        let mut high = self.entities.len();

        while high - low > LINEAR_SEARCH_THRESHOLD {
            let middle = low + (high - low) / 2;
            match self.entities[middle].id.cmp(&id) {
                std::cmp::Ordering::Equal => return Some(middle),
                std::cmp::Ordering::Greater => high = middle,
                std::cmp::Ordering::Less => low = middle + 1,
            }
        }

        self.entities[low..high]
            .iter()
            .position(|entity| entity.id == id)
            .map(|offset| low + offset)
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new(MAX_ENTITIES)
    }
}

impl fmt::Display for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entity in &self.entities {
            writeln!(f, "{entity}")?;
        }
        Ok(())
    }
}
