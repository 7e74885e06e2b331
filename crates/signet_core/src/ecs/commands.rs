//! # Commands
//!
//! Deferred structural changes recorded by systems.
//!
//! A system hook cannot add or remove components directly: the world is busy
//! running the pass and notifying systems mid-iteration would shift the
//! interest tables under the loop. Systems queue commands instead and the
//! world applies them, in recording order, once every system has run.

use std::fmt;

use super::component::Component;
use super::entity::EntityId;
use super::world::World;
use crate::error::EcsResult;

type Deferred = Box<dyn FnOnce(&mut World) -> EcsResult<()>>;

/// A deferred world mutation.
pub enum Command {
    /// Destroys an entity and everything attached to it.
    Destroy(EntityId),
    /// Changes whether a bulk clear destroys an entity.
    SetDestroyOnClear(EntityId, bool),
    /// Any other mutation, e.g. adding or removing a component.
    Apply(Deferred),
}

impl Command {
    /// Applies this command to the world.
    ///
    /// # Errors
    ///
    /// Whatever the underlying world operation returns.
    pub fn apply(self, world: &mut World) -> EcsResult<()> {
        match self {
            Self::Destroy(id) => world.destroy_entity(id),
            Self::SetDestroyOnClear(id, flag) => world.set_destroy_on_clear(id, flag),
            Self::Apply(deferred) => deferred(world),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Destroy(id) => f.debug_tuple("Destroy").field(id).finish(),
            Self::SetDestroyOnClear(id, flag) => {
                f.debug_tuple("SetDestroyOnClear").field(id).field(flag).finish()
            }
            Self::Apply(_) => f.write_str("Apply(..)"),
        }
    }
}

/// Ordered queue of [`Command`]s.
#[derive(Debug, Default)]
pub struct Commands {
    queue: Vec<Command>,
}

impl Commands {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues destruction of `id`.
    pub fn destroy(&mut self, id: EntityId) -> &mut Self {
        self.queue.push(Command::Destroy(id));
        self
    }

    /// Queues a change of `id`'s destroy-on-clear flag.
    pub fn set_destroy_on_clear(&mut self, id: EntityId, destroy: bool) -> &mut Self {
        self.queue.push(Command::SetDestroyOnClear(id, destroy));
        self
    }

    /// Queues attaching `value` to `id`.
    pub fn add_component<T: Component>(&mut self, id: EntityId, value: T) -> &mut Self {
        self.apply(move |world| world.add_component(id, value).map(drop))
    }

    /// Queues detaching `T` from `id`.
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> &mut Self {
        self.apply(move |world| world.remove_component::<T>(id).map(drop))
    }

    /// Queues creation of a new entity, then runs `build` on it.
    pub fn spawn<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut World, EntityId) -> EcsResult<()> + 'static,
    {
        self.apply(move |world| {
            let id = world.create_entity();
            build(world, id)
        })
    }

    /// Queues an arbitrary mutation.
    pub fn apply<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut World) -> EcsResult<()> + 'static,
    {
        self.queue.push(Command::Apply(Box::new(f)));
        self
    }

    /// Number of queued commands.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Checks whether nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Takes every queued command, leaving the queue empty.
    pub(crate) fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EcsError;

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Tag(u8);
    impl Component for Tag {}

    #[test]
    fn test_commands_apply_in_order() {
        let mut world = World::new();
        world.register_component::<Tag>().unwrap();
        let id = world.create_entity();

        let mut commands = Commands::new();
        commands
            .add_component(id, Tag(1))
            .apply(move |world| {
                world.get_component_mut::<Tag>(id)?.0 += 1;
                Ok(())
            })
            .set_destroy_on_clear(id, false);
        assert_eq!(commands.len(), 3);

        for command in commands.take() {
            command.apply(&mut world).unwrap();
        }
        assert!(commands.is_empty());
        assert_eq!(*world.get_component::<Tag>(id).unwrap(), Tag(2));
        assert!(!world.entity(id).unwrap().destroy_on_clear());
    }

    #[test]
    fn test_spawn_and_destroy() {
        let mut world = World::new();
        world.register_component::<Tag>().unwrap();

        let mut commands = Commands::new();
        commands.spawn(|world, id| world.add_component(id, Tag(7)).map(drop));
        for command in commands.take() {
            command.apply(&mut world).unwrap();
        }
        assert_eq!(world.entity_count(), 1);

        let id = world.entity_ids().next().unwrap();
        commands.destroy(id);
        for command in commands.take() {
            command.apply(&mut world).unwrap();
        }
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn test_failed_command_reports_error() {
        let mut world = World::new();
        world.register_component::<Tag>().unwrap();
        let id = world.create_entity();

        let mut commands = Commands::new();
        commands.remove_component::<Tag>(id);
        let result = commands.take().pop().unwrap().apply(&mut world);
        assert!(matches!(result, Err(EcsError::ComponentNotFound { .. })));
    }

    #[test]
    fn test_debug_format() {
        let mut commands = Commands::new();
        commands.apply(|_| Ok(()));
        assert_eq!(format!("{:?}", commands.take()), "[Apply(..)]");
    }
}
