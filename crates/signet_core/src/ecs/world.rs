//! # ECS World
//!
//! The central container: one entity registry, one pool slot per component
//! type id, and the ordered list of systems.
//!
//! ```text
//! add_component::<T>(e, v)
//!   1. resolve T's type id (must be registered)
//!   2. reject if e already carries T
//!   3. create T's pool on first use
//!   4. store v, set e's bit for T
//!   5. notify every system, in registration order
//!
//! destroy_entity(e)
//!   1. remove every component whose bit is set
//!   2. tell every system to drop e
//!   3. erase e from the registry
//! ```
//!
//! The destroy order is mandatory: steps 1 and 2 read the entity's signature,
//! which only exists while the registry still holds it.

use std::fmt;

use tracing::{debug, trace, warn};

use super::commands::Commands;
use super::component::{Component, ComponentRegistry, ComponentTypeId};
use super::entity::{Entity, EntityId, EntityRegistry};
use super::pool::{ComponentPool, ErasedPool};
use super::signature::Signature;
use super::system::{System, SystemContext, SystemId};
use crate::config::{WorldConfig, MAX_COMPONENT_TYPES, MAX_SYSTEMS};
use crate::error::{EcsError, EcsResult};

/// One pool per component type id; `None` until first use.
type PoolSlot = Option<Box<dyn ErasedPool>>;

/// Entities and component data, without the systems.
///
/// Systems receive mutable access to this during their hooks; structural
/// changes stay on [`World`] so systems are always notified.
pub struct WorldStorage {
    entities: EntityRegistry,
    components: ComponentRegistry,
    pools: Vec<PoolSlot>,
    pool_capacity: usize,
}

impl WorldStorage {
    fn new(config: &WorldConfig) -> Self {
        Self {
            entities: EntityRegistry::new(config.entity_reserve),
            components: ComponentRegistry::new(),
            pools: (0..MAX_COMPONENT_TYPES).map(|_| None).collect(),
            pool_capacity: config.pool_capacity,
        }
    }

    /// Gets an entity by id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if it is not alive.
    pub fn entity(&self, id: EntityId) -> EcsResult<&Entity> {
        self.entities.get(id)
    }

    /// The entity registry.
    #[must_use]
    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    /// Looks up the type id of a registered component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredComponent`] if `T` was never registered.
    pub fn component_id<T: Component>(&self) -> EcsResult<ComponentTypeId> {
        self.components.id_of::<T>()
    }

    /// Gets `id`'s component of type `T`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::UnregisteredComponent`] if `T` was never registered
    /// - [`EcsError::EntityNotFound`] if `id` is not alive
    /// - [`EcsError::ComponentNotFound`] if `id` does not carry `T`
    pub fn get<T: Component>(&self, id: EntityId) -> EcsResult<&T> {
        let type_id = self.carried::<T>(id)?;
        downcast_ref::<T>(&self.pools[type_id.index()], type_id, id)?.get(id)
    }

    /// Gets `id`'s component of type `T` mutably.
    ///
    /// # Errors
    ///
    /// Same as [`WorldStorage::get`].
    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> EcsResult<&mut T> {
        let type_id = self.carried::<T>(id)?;
        downcast_mut::<T>(&mut self.pools[type_id.index()], type_id, id)?.get_mut(id)
    }

    /// The pool for `T`, or `None` if no `T` was ever added.
    ///
    /// # Errors
    ///
    /// - [`EcsError::UnregisteredComponent`] if `T` was never registered
    /// - [`EcsError::PoolTypeMismatch`] if the slot holds another type
    pub fn pool<T: Component>(&self) -> EcsResult<Option<&ComponentPool<T>>> {
        let type_id = self.component_id::<T>()?;
        match self.pools[type_id.index()].as_deref() {
            None => Ok(None),
            Some(pool) => pool
                .as_any()
                .downcast_ref::<ComponentPool<T>>()
                .map(Some)
                .ok_or(EcsError::PoolTypeMismatch(type_id)),
        }
    }

    /// Live components in the pool for `type_id`; zero if it does not exist.
    #[must_use]
    pub fn pool_len(&self, type_id: ComponentTypeId) -> usize {
        self.pools[type_id.index()]
            .as_deref()
            .map_or(0, |pool| pool.live_count())
    }

    /// Resolves `T` and checks that `id` carries it.
    fn carried<T: Component>(&self, id: EntityId) -> EcsResult<ComponentTypeId> {
        let type_id = self.component_id::<T>()?;
        if self.entities.get(id)?.has_component(type_id) {
            Ok(type_id)
        } else {
            Err(EcsError::ComponentNotFound {
                entity: id,
                component: type_id,
            })
        }
    }
}

fn downcast_ref<T: Component>(
    slot: &PoolSlot,
    type_id: ComponentTypeId,
    id: EntityId,
) -> EcsResult<&ComponentPool<T>> {
    slot.as_deref()
        .ok_or(EcsError::ComponentNotFound {
            entity: id,
            component: type_id,
        })?
        .as_any()
        .downcast_ref::<ComponentPool<T>>()
        .ok_or(EcsError::PoolTypeMismatch(type_id))
}

fn downcast_mut<T: Component>(
    slot: &mut PoolSlot,
    type_id: ComponentTypeId,
    id: EntityId,
) -> EcsResult<&mut ComponentPool<T>> {
    slot.as_deref_mut()
        .ok_or(EcsError::ComponentNotFound {
            entity: id,
            component: type_id,
        })?
        .as_any_mut()
        .downcast_mut::<ComponentPool<T>>()
        .ok_or(EcsError::PoolTypeMismatch(type_id))
}

#[derive(Clone, Copy, Debug)]
enum Phase {
    Init,
    Input,
    Update,
    Draw,
}

/// The ECS World - container for all entities, components and systems.
///
/// Single-threaded: every call runs to completion on the caller's thread and
/// nothing inside is synchronized.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::new();
/// world.register_component::<Position>()?;
/// world.register_component::<Velocity>()?;
///
/// let required = world.signature_of::<Position>()? | world.signature_of::<Velocity>()?;
/// world.add_system(Movement::new(required))?;
///
/// let e = world.create_entity();
/// world.add_component(e, Position::default())?;
/// world.add_component(e, Velocity { x: 1.0, y: 0.0 })?;
///
/// world.init()?;
/// world.update(0.016)?;
/// ```
pub struct World {
    storage: WorldStorage,
    /// Slot 0 is reserved; systems occupy `[1, len)`.
    systems: Vec<Option<Box<dyn System>>>,
    commands: Commands,
    frame_count: u64,
}

impl World {
    /// Creates a world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(&WorldConfig::default())
    }

    /// Creates a world sized by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the config fails validation.
    pub fn with_config(config: &WorldConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: &WorldConfig) -> Self {
        let mut systems = Vec::with_capacity(MAX_SYSTEMS + 1);
        systems.push(None);
        Self {
            storage: WorldStorage::new(config),
            systems,
            commands: Commands::new(),
            frame_count: 0,
        }
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Registers a component type, assigning the next free type id.
    ///
    /// Registering the same type again returns its existing id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TooManyComponentTypes`] once every signature bit
    /// is taken.
    pub fn register_component<T: Component>(&mut self) -> EcsResult<ComponentTypeId> {
        let before = self.storage.components.len();
        let id = self.storage.components.register::<T>()?;
        if self.storage.components.len() > before {
            debug!(component = std::any::type_name::<T>(), id = id.raw(), "component registered");
        }
        Ok(id)
    }

    /// Looks up the type id of a registered component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredComponent`] if `T` was never registered.
    pub fn component_id<T: Component>(&self) -> EcsResult<ComponentTypeId> {
        self.storage.component_id::<T>()
    }

    /// A signature with only `T`'s bit set.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredComponent`] if `T` was never registered.
    pub fn signature_of<T: Component>(&self) -> EcsResult<Signature> {
        Ok(Signature::empty().with(self.component_id::<T>()?))
    }

    /// Attaches `value` to `id` and notifies every system.
    ///
    /// The pool for `T` is created on first use.
    ///
    /// # Errors
    ///
    /// - [`EcsError::UnregisteredComponent`] if `T` was never registered
    /// - [`EcsError::EntityNotFound`] if `id` is not alive
    /// - [`EcsError::DuplicateComponent`] if `id` already carries `T`
    /// - [`EcsError::PoolFull`] if `T`'s pool has no free slot
    ///
    /// Nothing is modified when an error is returned.
    pub fn add_component<T: Component>(&mut self, id: EntityId, value: T) -> EcsResult<&mut T> {
        let type_id = self.storage.component_id::<T>()?;
        if self.storage.entities.get(id)?.has_component(type_id) {
            return Err(EcsError::DuplicateComponent {
                entity: id,
                component: type_id,
            });
        }

        let slot = &mut self.storage.pools[type_id.index()];
        if slot.is_none() {
            debug!(
                component = std::any::type_name::<T>(),
                capacity = self.storage.pool_capacity,
                "creating component pool"
            );
            *slot = Some(Box::new(ComponentPool::<T>::new(
                type_id,
                self.storage.pool_capacity,
            )));
        }

        let entity = self.storage.entities.get_mut(id)?;
        downcast_mut::<T>(slot, type_id, id)?.add(entity, value)?;

        let entity = self.storage.entities.get(id)?;
        for system in self.systems.iter_mut().flatten() {
            system.on_component_added(entity);
        }

        self.storage.get_mut::<T>(id)
    }

    /// Gets `id`'s component of type `T`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::UnregisteredComponent`] if `T` was never registered
    /// - [`EcsError::EntityNotFound`] if `id` is not alive
    /// - [`EcsError::ComponentNotFound`] if `id` does not carry `T`
    pub fn get_component<T: Component>(&self, id: EntityId) -> EcsResult<&T> {
        self.storage.get::<T>(id)
    }

    /// Gets `id`'s component of type `T` mutably, in place.
    ///
    /// # Errors
    ///
    /// Same as [`World::get_component`].
    pub fn get_component_mut<T: Component>(&mut self, id: EntityId) -> EcsResult<&mut T> {
        self.storage.get_mut::<T>(id)
    }

    /// Detaches `T` from `id`, returning the value, and re-evaluates every
    /// system's interest in `id`.
    ///
    /// # Errors
    ///
    /// Same as [`World::get_component`].
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> EcsResult<T> {
        let type_id = self.storage.carried::<T>(id)?;
        let pool = downcast_mut::<T>(&mut self.storage.pools[type_id.index()], type_id, id)?;
        let entity = self.storage.entities.get_mut(id)?;
        let value = pool.remove(entity)?;

        let entity = self.storage.entities.get(id)?;
        for system in self.systems.iter_mut().flatten() {
            system.on_component_removed(entity);
        }
        Ok(value)
    }

    /// The pool for `T`, or `None` if no `T` was ever added.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredComponent`] if `T` was never registered.
    pub fn pool<T: Component>(&self) -> EcsResult<Option<&ComponentPool<T>>> {
        self.storage.pool::<T>()
    }

    /// Live components of `type_id`; zero before its pool exists.
    #[must_use]
    pub fn pool_len(&self, type_id: ComponentTypeId) -> usize {
        self.storage.pool_len(type_id)
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an entity with no components.
    pub fn create_entity(&mut self) -> EntityId {
        let id = self.storage.entities.create();
        trace!(entity = id.raw(), "entity created");
        id
    }

    /// Gets an entity by id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if it is not alive.
    pub fn entity(&self, id: EntityId) -> EcsResult<&Entity> {
        self.storage.entity(id)
    }

    /// Iterates live entity ids in ascending order.
    pub fn entity_ids(&self) -> impl DoubleEndedIterator<Item = EntityId> + '_ {
        self.storage.entities.ids()
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.storage.entities.len()
    }

    /// Sets whether [`World::clear`] destroys `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if it is not alive.
    pub fn set_destroy_on_clear(&mut self, id: EntityId, destroy: bool) -> EcsResult<()> {
        self.storage.entities.get_mut(id)?.set_destroy_on_clear(destroy);
        Ok(())
    }

    /// Destroys `id` with every component and every system's interest in it.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if it is not alive.
    pub fn destroy_entity(&mut self, id: EntityId) -> EcsResult<()> {
        let entity = self.storage.entities.get_mut(id)?;

        for type_id in entity.signature().iter_ones() {
            let pool = self.storage.pools[type_id.index()]
                .as_deref_mut()
                .ok_or(EcsError::ComponentNotFound {
                    entity: id,
                    component: type_id,
                })?;
            pool.remove_entity(entity)?;
        }

        for system in self.systems.iter_mut().flatten() {
            system.on_entity_destroyed(id);
        }

        self.storage.entities.remove(id)?;
        trace!(entity = id.raw(), "entity destroyed");
        Ok(())
    }

    /// Destroys every entity flagged destroy-on-clear, for scene changes.
    ///
    /// Walks the registry from the back so removals never shift an entity that
    /// is still to be visited. Returns how many entities were destroyed.
    ///
    /// # Errors
    ///
    /// Propagates the first failure of [`World::destroy_entity`].
    pub fn clear(&mut self) -> EcsResult<usize> {
        let mut destroyed = 0;
        let mut index = self.storage.entities.len();

        while index > 0 {
            index -= 1;
            let Some(entity) = self.storage.entities.at(index) else {
                continue;
            };
            if entity.destroy_on_clear() {
                let id = entity.id();
                self.destroy_entity(id)?;
                destroyed += 1;
            }
        }

        debug!(destroyed, remaining = self.entity_count(), "world cleared");
        Ok(destroyed)
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Registers a system after the existing ones.
    ///
    /// Whatever the system's interest table held is dropped; entities that
    /// already satisfy its signature are then admitted immediately.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TooManySystems`] at the system ceiling.
    pub fn add_system<S: System + 'static>(&mut self, mut system: S) -> EcsResult<SystemId> {
        if self.system_count() >= MAX_SYSTEMS {
            return Err(EcsError::TooManySystems { max: MAX_SYSTEMS });
        }

        system.state_mut().interest_mut().clear();
        for entity in self.storage.entities.iter() {
            system.on_component_added(entity);
        }

        let id = SystemId::from_slot(self.systems.len());
        debug!(
            system = system.name(),
            slot = id.slot(),
            signature = %system.signature(),
            admitted = system.tracked_count(),
            "system registered"
        );
        self.systems.push(Some(Box::new(system)));
        Ok(id)
    }

    /// Number of registered systems.
    #[inline]
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.len() - 1
    }

    /// Gets a registered system.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotFound`] for an unknown id.
    pub fn system(&self, id: SystemId) -> EcsResult<&dyn System> {
        self.systems
            .get(id.slot())
            .and_then(Option::as_deref)
            .ok_or(EcsError::SystemNotFound(id.slot()))
    }

    /// Entities currently tracked by a system.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotFound`] for an unknown id.
    pub fn tracked_count(&self, id: SystemId) -> EcsResult<usize> {
        Ok(self.system(id)?.tracked_count())
    }

    // =========================================================================
    // Frame lifecycle
    // =========================================================================

    /// Runs every system's `init` hook.
    ///
    /// # Errors
    ///
    /// The first hook or command failure; the remaining systems still run.
    pub fn init(&mut self) -> EcsResult<()> {
        self.run_phase(Phase::Init, 0.0)
    }

    /// Runs every system's `input` hook.
    ///
    /// # Errors
    ///
    /// The first hook or command failure; the remaining systems still run.
    pub fn input(&mut self, dt: f32) -> EcsResult<()> {
        self.run_phase(Phase::Input, dt)
    }

    /// Runs every system's `update` hook, then advances the frame counter.
    ///
    /// The counter advances even when a hook fails.
    ///
    /// # Errors
    ///
    /// The first hook or command failure; the remaining systems still run.
    pub fn update(&mut self, dt: f32) -> EcsResult<()> {
        let result = self.run_phase(Phase::Update, dt);
        self.frame_count += 1;
        result
    }

    /// Runs every system's `draw` hook.
    ///
    /// # Errors
    ///
    /// The first hook or command failure; the remaining systems still run.
    pub fn draw(&mut self) -> EcsResult<()> {
        self.run_phase(Phase::Draw, 0.0)
    }

    /// Frames completed by [`World::update`].
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn run_phase(&mut self, phase: Phase, dt: f32) -> EcsResult<()> {
        let mut outcome = Ok(());
        let mut ctx = SystemContext::new(&mut self.storage, &mut self.commands, self.frame_count);

        for system in self.systems.iter_mut().flatten() {
            let result = match phase {
                Phase::Init => system.init(&mut ctx),
                Phase::Input => system.input(&mut ctx, dt),
                Phase::Update => system.update(&mut ctx, dt),
                Phase::Draw => system.draw(&mut ctx),
            };
            if let Err(error) = result {
                warn!(system = system.name(), ?phase, %error, "system hook failed");
                if outcome.is_ok() {
                    outcome = Err(error);
                }
            }
        }

        let applied = self.apply_commands();
        outcome.and(applied)
    }

    /// Applies queued commands in recording order.
    ///
    /// A failing command is logged and skipped; the first failure is returned
    /// after the rest have been applied.
    fn apply_commands(&mut self) -> EcsResult<()> {
        let mut outcome = Ok(());
        for command in self.commands.take() {
            if let Err(error) = command.apply(self) {
                warn!(%error, "deferred command failed");
                if outcome.is_ok() {
                    outcome = Err(error);
                }
            }
        }
        outcome
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "------------ world (frame {}) ------------", self.frame_count)?;
        writeln!(f, "Entities ({}):", self.entity_count())?;
        write!(f, "{}", self.storage.entities)?;

        writeln!(f, "Components:")?;
        for pool in self.storage.pools.iter().flatten() {
            writeln!(f, "{}", pool.describe())?;
        }

        writeln!(f, "Systems:")?;
        for (slot, system) in self.systems.iter().enumerate() {
            if let Some(system) = system {
                writeln!(f, "[{slot}] {}", system.describe())?;
            }
        }
        write!(f, "------------------------------------------")
    }
}
