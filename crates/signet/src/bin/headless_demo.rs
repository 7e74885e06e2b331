//! # SIGNET Headless Demo
//!
//! Spawns a swarm of particles, moves them, expires them and respawns
//! replacements through deferred commands, then prints frame statistics and a
//! world dump.
//!
//! ```bash
//! cargo run --bin headless_demo
//! cargo run --bin headless_demo -- loop.toml
//! ```

use signet::{GameLoop, GameLoopConfig};
use signet::core::{
    Component, EcsResult, System, SystemContext, SystemState, World, WorldConfig,
};

/// Frames to simulate.
const FRAMES: u64 = 600;

/// Fixed step handed to the systems.
const STEP_SECONDS: f32 = 1.0 / 60.0;

/// Live particles at any time.
const SWARM_SIZE: u32 = 64;

#[derive(Clone, Copy, Debug, Default)]
struct Position {
    x: f32,
    y: f32,
}
impl Component for Position {}

#[derive(Clone, Copy, Debug, Default)]
struct Velocity {
    x: f32,
    y: f32,
}
impl Component for Velocity {}

/// Frames left before the particle expires.
#[derive(Clone, Copy, Debug, Default)]
struct Lifetime(u32);
impl Component for Lifetime {}

struct Movement {
    state: SystemState,
}

impl System for Movement {
    fn state(&self) -> &SystemState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SystemState {
        &mut self.state
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>, dt: f32) -> EcsResult<()> {
        for id in self.state.interest().iter() {
            let velocity = *ctx.get::<Velocity>(id)?;
            let position = ctx.get_mut::<Position>(id)?;
            position.x += velocity.x * dt;
            position.y += velocity.y * dt;
        }
        Ok(())
    }
}

/// Expires particles and queues a replacement for each.
struct Spawner {
    state: SystemState,
    spawned: u32,
}

impl System for Spawner {
    fn state(&self) -> &SystemState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SystemState {
        &mut self.state
    }

    fn init(&mut self, ctx: &mut SystemContext<'_>) -> EcsResult<()> {
        for _ in 0..SWARM_SIZE {
            self.queue_particle(ctx);
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) -> EcsResult<()> {
        for id in self.state.interest().to_vec() {
            let lifetime = ctx.get_mut::<Lifetime>(id)?;
            lifetime.0 = lifetime.0.saturating_sub(1);
            if lifetime.0 == 0 {
                ctx.commands().destroy(id);
                self.queue_particle(ctx);
            }
        }
        Ok(())
    }
}

impl Spawner {
    #[allow(clippy::cast_precision_loss)]
    fn queue_particle(&mut self, ctx: &mut SystemContext<'_>) {
        let seed = self.spawned;
        self.spawned += 1;

        let angle = (seed % 360) as f32 * std::f32::consts::PI / 180.0;
        let speed = 1.0 + (seed % 7) as f32;
        let lifetime = 30 + (seed * 37) % 240;

        ctx.commands().spawn(move |world, id| {
            world.add_component(id, Position::default())?;
            world.add_component(
                id,
                Velocity {
                    x: angle.cos() * speed,
                    y: angle.sin() * speed,
                },
            )?;
            world.add_component(id, Lifetime(lifetime))?;
            Ok(())
        });
    }
}

fn build_world() -> EcsResult<World> {
    let mut world = World::with_config(&WorldConfig::default())?;
    world.register_component::<Position>()?;
    world.register_component::<Velocity>()?;
    world.register_component::<Lifetime>()?;

    let movement = world.signature_of::<Position>()? | world.signature_of::<Velocity>()?;
    world.add_system(Movement {
        state: SystemState::new(movement),
    })?;
    world.add_system(Spawner {
        state: SystemState::new(world.signature_of::<Lifetime>()?),
        spawned: 0,
    })?;
    Ok(world)
}

fn main() {
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                      SIGNET HEADLESS DEMO                        ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");

    let config = match std::env::args().nth(1) {
        Some(path) => match GameLoopConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {path}: {e}");
                std::process::exit(1);
            }
        },
        None => GameLoopConfig::default(),
    };

    let result = build_world()
        .and_then(|world| GameLoop::new(world, config))
        .and_then(|mut game_loop| {
            game_loop.run_fixed(FRAMES, STEP_SECONDS)?;
            Ok(game_loop)
        });

    let game_loop = match result {
        Ok(game_loop) => game_loop,
        Err(e) => {
            eprintln!("Simulation failed: {e}");
            std::process::exit(1);
        }
    };

    println!();
    println!("Frames:     {}", game_loop.frame_count());
    println!("Entities:   {}", game_loop.world().entity_count());
    println!("Systems:    {}", game_loop.world().system_count());
    println!();
    println!("{}", game_loop.stats());

    let world = game_loop.into_world();
    let summary = world.to_string();
    for line in summary.lines().take(12) {
        println!("{line}");
    }
}
