//! # SIGNET Core
//!
//! Entity Component System with signature-routed systems:
//! - Fixed-capacity dense component pools, one per component type
//! - 32-bit component signatures matched against system requirements
//! - Push-based interest tracking; no per-frame entity scans
//!
//! ## Architecture Rules
//!
//! 1. **Dense storage** - live components occupy a contiguous slot range
//! 2. **Notify, never poll** - every add, remove and destroy reaches every system
//! 3. **Deferred structure** - systems queue structural changes as commands
//!
//! ## Example
//!
//! ```rust,ignore
//! use signet_core::{World, Component};
//!
//! #[derive(Default)]
//! struct Health(u32);
//! impl Component for Health {}
//!
//! let mut world = World::new();
//! world.register_component::<Health>()?;
//! let e = world.create_entity();
//! world.add_component(e, Health(100))?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::{
    WorldConfig, MAX_COMPONENT_TYPES, MAX_ENTITIES, MAX_ENTITIES_PER_COMPONENT_TYPE, MAX_SYSTEMS,
};
pub use ecs::{
    Command, Commands, Component, ComponentPool, ComponentRegistry, ComponentTypeId, Entity,
    EntityId, EntityRegistry, ErasedPool, InterestTable, Signature, System, SystemContext,
    SystemId, SystemState, World, WorldStorage,
};
pub use error::{EcsError, EcsResult};
