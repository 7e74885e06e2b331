//! Integration tests for the World: routing, destruction, clearing and the
//! frame lifecycle.

use signet_core::{
    Component, EcsError, EcsResult, EntityId, Signature, System, SystemContext, SystemState,
    World, WorldConfig, MAX_COMPONENT_TYPES, MAX_SYSTEMS,
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}
impl Component for Position {}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Velocity {
    x: f32,
    y: f32,
}
impl Component for Velocity {}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Lifetime(u32);
impl Component for Lifetime {}

/// Tracks entities and does nothing else.
struct Watcher {
    state: SystemState,
}

impl Watcher {
    fn new(signature: Signature) -> Self {
        Self {
            state: SystemState::new(signature),
        }
    }
}

impl System for Watcher {
    fn state(&self) -> &SystemState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SystemState {
        &mut self.state
    }
}

/// Counts down lifetimes and queues destruction of expired entities.
struct Reaper {
    state: SystemState,
}

impl System for Reaper {
    fn state(&self) -> &SystemState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SystemState {
        &mut self.state
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) -> EcsResult<()> {
        for id in self.state.interest().to_vec() {
            let lifetime = ctx.get_mut::<Lifetime>(id)?;
            lifetime.0 = lifetime.0.saturating_sub(1);
            if lifetime.0 == 0 {
                ctx.commands().destroy(id);
            }
        }
        Ok(())
    }
}

/// Fails every update.
struct Broken {
    state: SystemState,
}

impl System for Broken {
    fn state(&self) -> &SystemState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SystemState {
        &mut self.state
    }

    fn update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> EcsResult<()> {
        Err(EcsError::InvalidConfig("broken system".into()))
    }
}

fn physics_world() -> World {
    let mut world = World::new();
    world.register_component::<Position>().unwrap();
    world.register_component::<Velocity>().unwrap();
    world.register_component::<Lifetime>().unwrap();
    world
}

fn both(world: &World) -> Signature {
    world.signature_of::<Position>().unwrap() | world.signature_of::<Velocity>().unwrap()
}

#[test]
fn test_admission_is_order_independent() {
    let mut world = physics_world();
    let system = world.add_system(Watcher::new(both(&world))).unwrap();

    let a = world.create_entity();
    world.add_component(a, Position::default()).unwrap();
    assert_eq!(world.tracked_count(system).unwrap(), 0);
    world.add_component(a, Velocity::default()).unwrap();

    let b = world.create_entity();
    world.add_component(b, Velocity::default()).unwrap();
    world.add_component(b, Position::default()).unwrap();

    assert_eq!(world.tracked_count(system).unwrap(), 2);
    assert!(world.system(system).unwrap().is_tracking(a));
    assert!(world.system(system).unwrap().is_tracking(b));
}

#[test]
fn test_eviction_on_remove_or_destroy() {
    let mut world = physics_world();
    let system = world.add_system(Watcher::new(both(&world))).unwrap();

    let a = world.create_entity();
    let b = world.create_entity();
    for id in [a, b] {
        world.add_component(id, Position::default()).unwrap();
        world.add_component(id, Velocity::default()).unwrap();
    }

    world.remove_component::<Position>(a).unwrap();
    assert!(!world.system(system).unwrap().is_tracking(a));

    world.destroy_entity(b).unwrap();
    assert_eq!(world.tracked_count(system).unwrap(), 0);
}

#[test]
fn test_add_then_remove_restores_signature() {
    let mut world = physics_world();
    let id = world.create_entity();
    let before = world.entity(id).unwrap().signature();

    world.add_component(id, Lifetime(3)).unwrap();
    assert_eq!(world.remove_component::<Lifetime>(id).unwrap(), Lifetime(3));

    assert_eq!(world.entity(id).unwrap().signature(), before);
    assert!(matches!(
        world.get_component::<Lifetime>(id),
        Err(EcsError::ComponentNotFound { .. })
    ));
}

#[test]
fn test_destroy_detaches_everything() {
    let mut world = physics_world();
    let s1 = world
        .add_system(Watcher::new(world.signature_of::<Position>().unwrap()))
        .unwrap();
    let s2 = world
        .add_system(Watcher::new(world.signature_of::<Velocity>().unwrap()))
        .unwrap();

    let id = world.create_entity();
    world.add_component(id, Position { x: 1.0, y: 1.0 }).unwrap();
    world.add_component(id, Velocity { x: 2.0, y: 2.0 }).unwrap();
    assert_eq!(world.tracked_count(s1).unwrap(), 1);
    assert_eq!(world.tracked_count(s2).unwrap(), 1);

    world.destroy_entity(id).unwrap();

    assert_eq!(world.tracked_count(s1).unwrap(), 0);
    assert_eq!(world.tracked_count(s2).unwrap(), 0);
    assert!(!world.pool::<Position>().unwrap().unwrap().contains(id));
    assert!(!world.pool::<Velocity>().unwrap().unwrap().contains(id));
    assert_eq!(world.entity(id), Err(EcsError::EntityNotFound(id)));
    assert_eq!(world.destroy_entity(id), Err(EcsError::EntityNotFound(id)));
}

#[test]
fn test_destroy_keeps_other_components_reachable() {
    let mut world = physics_world();
    let ids: Vec<EntityId> = (0..4).map(|_| world.create_entity()).collect();
    for (i, id) in ids.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let x = i as f32;
        world.add_component(*id, Position { x, y: 0.0 }).unwrap();
    }

    world.destroy_entity(ids[1]).unwrap();

    let position_id = world.component_id::<Position>().unwrap();
    assert_eq!(world.pool_len(position_id), 3);
    for (i, id) in ids.iter().enumerate().filter(|(i, _)| *i != 1) {
        #[allow(clippy::cast_precision_loss)]
        let x = i as f32;
        assert_eq!(world.get_component::<Position>(*id).unwrap().x, x);
    }
}

#[test]
fn test_clear_keeps_unflagged_entities() {
    let mut world = physics_world();
    let system = world
        .add_system(Watcher::new(world.signature_of::<Position>().unwrap()))
        .unwrap();

    let a = world.create_entity();
    let keep = world.create_entity();
    let c = world.create_entity();
    for id in [a, keep, c] {
        world.add_component(id, Position::default()).unwrap();
    }
    world.set_destroy_on_clear(keep, false).unwrap();

    assert_eq!(world.clear().unwrap(), 2);

    assert_eq!(world.entity_ids().collect::<Vec<_>>(), vec![keep]);
    assert_eq!(world.tracked_count(system).unwrap(), 1);
    assert_eq!(world.pool_len(world.component_id::<Position>().unwrap()), 1);
}

#[test]
fn test_frame_counter_advances_per_update() {
    let mut world = physics_world();
    world.add_system(Watcher::new(both(&world))).unwrap();
    world
        .add_system(Watcher::new(world.signature_of::<Position>().unwrap()))
        .unwrap();
    world
        .add_system(Reaper {
            state: SystemState::new(world.signature_of::<Lifetime>().unwrap()),
        })
        .unwrap();

    let id = world.create_entity();
    world.add_component(id, Position::default()).unwrap();
    world.add_component(id, Velocity::default()).unwrap();
    world.add_component(id, Lifetime(1_000)).unwrap();

    world.init().unwrap();
    let deltas = [0.0, 0.016, 1.0e6, 0.5, 0.0, 0.001, f32::MAX];
    for dt in deltas {
        world.input(dt).unwrap();
        world.update(dt).unwrap();
        world.draw().unwrap();
    }
    assert_eq!(world.frame_count(), deltas.len() as u64);
}

#[test]
fn test_frame_counter_without_systems() {
    let mut world = World::new();
    for _ in 0..5 {
        world.update(0.016).unwrap();
    }
    assert_eq!(world.frame_count(), 5);
}

#[test]
fn test_cloned_state_does_not_carry_tracking() {
    let mut world = physics_world();
    let position = world.signature_of::<Position>().unwrap();
    let original = world.add_system(Watcher::new(position)).unwrap();

    let id = world.create_entity();
    world.add_component(id, Position::default()).unwrap();
    let copied = world.system(original).unwrap().state().clone();
    assert_eq!(copied.interest().len(), 1);

    // The copy still lists `id` after this.
    world.remove_component::<Position>(id).unwrap();

    let late = world.add_system(Watcher { state: copied }).unwrap();
    assert_eq!(world.tracked_count(late).unwrap(), 0);
    assert!(!world.system(late).unwrap().is_tracking(id));
}

#[test]
fn test_failing_hook_does_not_stop_the_pass() {
    let mut world = physics_world();
    world
        .add_system(Broken {
            state: SystemState::new(Signature::empty()),
        })
        .unwrap();
    world
        .add_system(Reaper {
            state: SystemState::new(world.signature_of::<Lifetime>().unwrap()),
        })
        .unwrap();

    let id = world.create_entity();
    world.add_component(id, Lifetime(5)).unwrap();

    assert_eq!(
        world.update(0.016),
        Err(EcsError::InvalidConfig("broken system".into()))
    );
    assert_eq!(world.frame_count(), 1);
    assert_eq!(*world.get_component::<Lifetime>(id).unwrap(), Lifetime(4));
}

#[test]
fn test_commands_from_update_apply_after_pass() {
    let mut world = physics_world();
    let reaper = world
        .add_system(Reaper {
            state: SystemState::new(world.signature_of::<Lifetime>().unwrap()),
        })
        .unwrap();

    let short = world.create_entity();
    world.add_component(short, Lifetime(1)).unwrap();
    let long = world.create_entity();
    world.add_component(long, Lifetime(3)).unwrap();

    world.update(0.016).unwrap();
    assert_eq!(world.entity_ids().collect::<Vec<_>>(), vec![long]);
    assert_eq!(world.tracked_count(reaper).unwrap(), 1);

    world.update(0.016).unwrap();
    world.update(0.016).unwrap();
    assert_eq!(world.entity_count(), 0);
}

#[test]
fn test_late_system_sees_existing_entities() {
    let mut world = physics_world();
    let id = world.create_entity();
    world.add_component(id, Position::default()).unwrap();
    world.add_component(id, Velocity::default()).unwrap();

    let system = world.add_system(Watcher::new(both(&world))).unwrap();
    assert_eq!(world.tracked_count(system).unwrap(), 1);
}

#[test]
fn test_system_ceiling() {
    let mut world = World::new();
    for _ in 0..MAX_SYSTEMS {
        world.add_system(Watcher::new(Signature::empty())).unwrap();
    }
    assert_eq!(
        world.add_system(Watcher::new(Signature::empty())).unwrap_err(),
        EcsError::TooManySystems { max: MAX_SYSTEMS }
    );
    assert_eq!(world.system_count(), MAX_SYSTEMS);
}

macro_rules! marker_components {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Default)]
            struct $name;
            impl Component for $name {}
        )*

        fn register_markers(world: &mut World) -> EcsResult<()> {
            $( world.register_component::<$name>()?; )*
            Ok(())
        }
    };
}

marker_components!(
    M00, M01, M02, M03, M04, M05, M06, M07, M08, M09, M10, M11, M12, M13, M14, M15, M16, M17,
    M18, M19, M20, M21, M22, M23, M24, M25, M26, M27, M28, M29, M30, M31,
);

#[test]
fn test_component_type_ceiling() {
    let mut world = World::new();
    register_markers(&mut world).unwrap();
    assert_eq!(
        world.register_component::<Position>().unwrap_err(),
        EcsError::TooManyComponentTypes {
            max: MAX_COMPONENT_TYPES
        }
    );
    // Already registered types still resolve.
    assert_eq!(world.component_id::<M31>().unwrap().index(), 31);
    assert!(world.register_component::<M00>().is_ok());
}

#[test]
fn test_pool_full_leaves_entity_untouched() {
    let config = WorldConfig {
        entity_reserve: 8,
        pool_capacity: 2,
    };
    let mut world = World::with_config(&config).unwrap();
    world.register_component::<Lifetime>().unwrap();

    for _ in 0..2 {
        let id = world.create_entity();
        world.add_component(id, Lifetime(1)).unwrap();
    }
    let extra = world.create_entity();
    assert!(matches!(
        world.add_component(extra, Lifetime(1)),
        Err(EcsError::PoolFull { capacity: 2, .. })
    ));
    assert!(world.entity(extra).unwrap().signature().is_empty());
}

#[test]
fn test_world_from_config_file() {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = std::env::temp_dir().join(format!("test_world_config_{id}.toml"));
    std::fs::write(&path, "entity_reserve = 64\npool_capacity = 16\n").unwrap();

    let config = WorldConfig::load(&path).unwrap();
    let world = World::with_config(&config).unwrap();
    assert_eq!(world.entity_count(), 0);
    assert_eq!(config.pool_capacity, 16);

    std::fs::remove_file(&path).ok();
}
