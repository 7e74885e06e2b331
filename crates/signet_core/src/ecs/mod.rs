//! # Entity Component System
//!
//! Entities are ids with a component signature, components live in one dense
//! pool per type, and systems track the entities whose signature fits theirs.
//!
//! ## Design Philosophy
//!
//! - Pools are allocated once, at their fixed capacity, on first use
//! - Removal compacts by swapping the last live element into the hole
//! - Systems are told about every structural change; they never scan
//! - Structural changes requested from inside a system are deferred

mod commands;
mod component;
mod entity;
mod pool;
mod signature;
mod system;
mod world;

pub use commands::{Command, Commands};
pub use component::{Component, ComponentRegistry, ComponentTypeId};
pub use entity::{Entity, EntityId, EntityRegistry, LINEAR_SEARCH_THRESHOLD};
pub use pool::{ComponentPool, ErasedPool};
pub use signature::Signature;
pub use system::{InterestTable, System, SystemContext, SystemId, SystemState};
pub use world::{World, WorldStorage};
