//! # Systems
//!
//! A system declares the component types it needs as a [`Signature`] and keeps
//! an interest table of the entities that currently satisfy it. The world
//! pushes every structural change to every system; systems never poll.
//!
//! ```text
//! untracked --(signature now fits)--> tracked
//! tracked   --(required bit cleared | entity destroyed)--> untracked
//! ```

use std::collections::HashMap;
use std::fmt;

use super::commands::Commands;
use super::component::{Component, ComponentTypeId};
use super::entity::{Entity, EntityId};
use super::pool::ComponentPool;
use super::signature::Signature;
use super::world::WorldStorage;
use crate::config::MAX_ENTITIES;
use crate::error::EcsResult;

/// First occupied slot; slot 0 is a sentinel.
const FIRST_SLOT: usize = 1;

/// Identifier of a registered system. Ids start at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SystemId(usize);

impl SystemId {
    #[inline]
    pub(crate) const fn from_slot(slot: usize) -> Self {
        Self(slot)
    }

    /// Registration slot of this system.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> usize {
        self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system #{}", self.0)
    }
}

/// The entities a system currently tracks.
///
/// Same layout as a component pool without the payload: a dense slot array of
/// entity ids plus the inverse map, slot 0 reserved, swap-to-end removal.
#[derive(Clone, Debug)]
pub struct InterestTable {
    /// Dense slots; index 0 is always `None`.
    slots: Vec<Option<EntityId>>,
    /// Entity to slot, the exact inverse of `slots[1..]`.
    entity_to_slot: HashMap<EntityId, usize>,
}

impl InterestTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(MAX_ENTITIES + FIRST_SLOT);
        slots.push(None);
        Self {
            slots,
            entity_to_slot: HashMap::with_capacity(MAX_ENTITIES),
        }
    }

    /// Number of tracked entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - FIRST_SLOT
    }

    /// Checks whether nothing is tracked.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks whether `id` is tracked.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entity_to_slot.contains_key(&id)
    }

    /// Returns the dense slot of a tracked entity.
    #[inline]
    #[must_use]
    pub fn slot_of(&self, id: EntityId) -> Option<usize> {
        self.entity_to_slot.get(&id).copied()
    }

    /// Starts tracking `id`. Returns `false` if it was already tracked.
    pub(crate) fn insert(&mut self, id: EntityId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.entity_to_slot.insert(id, self.slots.len());
        self.slots.push(Some(id));
        true
    }

    /// Stops tracking `id` with swap-to-end compaction. Returns `false` if it
    /// was not tracked.
    pub(crate) fn remove(&mut self, id: EntityId) -> bool {
        let Some(slot) = self.slot_of(id) else {
            return false;
        };
        let last = self.slots.len() - 1;

        self.slots.swap(slot, last);
        self.slots.pop();

        if self.slots.len() > slot {
            if let Some(moved) = self.slots[slot] {
                self.entity_to_slot.insert(moved, slot);
            }
        }
        self.entity_to_slot.remove(&id);
        true
    }

    /// Drops every tracked entity.
    pub(crate) fn clear(&mut self) {
        self.slots.truncate(FIRST_SLOT);
        self.entity_to_slot.clear();
    }

    /// Iterates tracked entities in slot order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots[FIRST_SLOT..].iter().flatten().copied()
    }

    /// Copies the tracked ids, for loops that also need `&mut self`.
    #[must_use]
    pub fn to_vec(&self) -> Vec<EntityId> {
        self.iter().collect()
    }
}

impl Default for InterestTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Requirement signature plus interest table, embedded in every system.
#[derive(Clone, Debug)]
pub struct SystemState {
    /// Set once at construction.
    signature: Signature,
    interest: InterestTable,
}

impl SystemState {
    /// Creates the state for a system requiring `signature`.
    #[must_use]
    pub fn new(signature: Signature) -> Self {
        Self {
            signature,
            interest: InterestTable::new(),
        }
    }

    /// The required signature.
    #[inline]
    #[must_use]
    pub const fn signature(&self) -> Signature {
        self.signature
    }

    /// The tracked entities.
    #[inline]
    #[must_use]
    pub fn interest(&self) -> &InterestTable {
        &self.interest
    }

    /// The tracked entities, mutably. Only world notifications change them.
    #[inline]
    pub(crate) fn interest_mut(&mut self) -> &mut InterestTable {
        &mut self.interest
    }

    /// Checks whether `entity` satisfies the requirement.
    #[inline]
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        Signature::fits(self.signature, entity.signature())
    }
}

/// What a system sees during a lifecycle hook.
///
/// Component values can be read and written in place. Structural changes go
/// through [`SystemContext::commands`] and are applied once the pass is over.
pub struct SystemContext<'w> {
    storage: &'w mut WorldStorage,
    commands: &'w mut Commands,
    frame: u64,
}

impl<'w> SystemContext<'w> {
    pub(crate) fn new(storage: &'w mut WorldStorage, commands: &'w mut Commands, frame: u64) -> Self {
        Self {
            storage,
            commands,
            frame,
        }
    }

    /// Frames completed so far.
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Gets an entity by id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`](crate::EcsError::EntityNotFound) if it is not alive.
    pub fn entity(&self, id: EntityId) -> EcsResult<&Entity> {
        self.storage.entity(id)
    }

    /// Gets a component.
    ///
    /// # Errors
    ///
    /// See [`World::get_component`](crate::World::get_component).
    pub fn get<T: Component>(&self, id: EntityId) -> EcsResult<&T> {
        self.storage.get::<T>(id)
    }

    /// Gets a component mutably.
    ///
    /// # Errors
    ///
    /// See [`World::get_component_mut`](crate::World::get_component_mut).
    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> EcsResult<&mut T> {
        self.storage.get_mut::<T>(id)
    }

    /// The whole pool for `T`, for dense iteration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent)
    /// if `T` was never registered.
    pub fn pool<T: Component>(&self) -> EcsResult<Option<&ComponentPool<T>>> {
        self.storage.pool::<T>()
    }

    /// Looks up the type id of a registered component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent)
    /// if `T` was never registered.
    pub fn component_id<T: Component>(&self) -> EcsResult<ComponentTypeId> {
        self.storage.component_id::<T>()
    }

    /// Queue of structural changes applied after the current pass.
    #[inline]
    pub fn commands(&mut self) -> &mut Commands {
        self.commands
    }
}

/// A unit of per-frame logic over the entities matching its signature.
///
/// Implementors embed a [`SystemState`] and expose it; admission and eviction
/// are provided on top of it. Every lifecycle hook defaults to a no-op.
///
/// # Example
///
/// ```rust,ignore
/// struct Movement { state: SystemState }
///
/// impl System for Movement {
///     fn state(&self) -> &SystemState { &self.state }
///     fn state_mut(&mut self) -> &mut SystemState { &mut self.state }
///
///     fn update(&mut self, ctx: &mut SystemContext<'_>, dt: f32) -> EcsResult<()> {
///         for id in self.state.interest().iter() {
///             let velocity = *ctx.get::<Velocity>(id)?;
///             ctx.get_mut::<Position>(id)?.x += velocity.x * dt;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait System {
    /// Name used in logs and debug dumps.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// The embedded signature and interest table.
    fn state(&self) -> &SystemState;

    /// The embedded signature and interest table, mutably.
    fn state_mut(&mut self) -> &mut SystemState;

    /// The required signature.
    fn signature(&self) -> Signature {
        self.state().signature()
    }

    /// Checks whether the requirement includes `component`.
    fn has_signature_part(&self, component: ComponentTypeId) -> bool {
        self.state().signature().test(component)
    }

    /// Number of tracked entities.
    fn tracked_count(&self) -> usize {
        self.state().interest().len()
    }

    /// Checks whether `id` is tracked.
    fn is_tracking(&self, id: EntityId) -> bool {
        self.state().interest().contains(id)
    }

    /// Called after `entity` gained a component.
    ///
    /// Starts tracking once the signature fits; already tracked entities are
    /// left where they are.
    fn on_component_added(&mut self, entity: &Entity) {
        let state = self.state_mut();
        if state.matches(entity) {
            state.interest_mut().insert(entity.id());
        }
    }

    /// Called after `entity` lost a component.
    fn on_component_removed(&mut self, entity: &Entity) {
        let state = self.state_mut();
        if !state.matches(entity) {
            state.interest_mut().remove(entity.id());
        }
    }

    /// Called while `id` is being destroyed, after its components are gone.
    fn on_entity_destroyed(&mut self, id: EntityId) {
        self.state_mut().interest_mut().remove(id);
    }

    /// Runs once from [`World::init`](crate::World::init).
    ///
    /// # Errors
    ///
    /// Implementations decide; the default never fails.
    fn init(&mut self, _ctx: &mut SystemContext<'_>) -> EcsResult<()> {
        Ok(())
    }

    /// Runs every frame before update.
    ///
    /// # Errors
    ///
    /// Implementations decide; the default never fails.
    fn input(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> EcsResult<()> {
        Ok(())
    }

    /// Runs every frame.
    ///
    /// # Errors
    ///
    /// Implementations decide; the default never fails.
    fn update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> EcsResult<()> {
        Ok(())
    }

    /// Runs every frame after update.
    ///
    /// # Errors
    ///
    /// Implementations decide; the default never fails.
    fn draw(&mut self, _ctx: &mut SystemContext<'_>) -> EcsResult<()> {
        Ok(())
    }

    /// One-line summary for debug dumps.
    fn describe(&self) -> String {
        let ids: Vec<String> = self.state().interest().iter().map(|id| id.to_string()).collect();
        format!(
            "{} requires {}: tracking {} [{}]",
            self.name(),
            self.signature(),
            self.tracked_count(),
            ids.join(", ")
        )
    }
}
