//! # ECS Error Types
//!
//! All errors that can occur while manipulating a [`World`](crate::World).
//!
//! Structural operations (registration, adding, removing and destroying)
//! detect every failure before touching state, so an error leaves the world as
//! it was. The frame phases differ: when a hook fails the remaining systems
//! still run, queued commands still apply and `update` still advances the
//! frame counter.

use thiserror::Error;

use crate::ecs::{ComponentTypeId, EntityId};

/// Errors that can occur in the ECS.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// No live entity has this id.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The entity does not carry a component of this type.
    #[error("entity {entity} has no component {component}")]
    ComponentNotFound {
        /// The entity that was queried.
        entity: EntityId,
        /// The component type that was missing.
        component: ComponentTypeId,
    },

    /// The component type was never registered with the world.
    #[error("component type not registered: {0}")]
    UnregisteredComponent(&'static str),

    /// The entity already carries a component of this type.
    #[error("entity {entity} already has component {component}")]
    DuplicateComponent {
        /// The entity that was targeted.
        entity: EntityId,
        /// The component type that was already present.
        component: ComponentTypeId,
    },

    /// The pool for this component type has no free slot left.
    #[error("component pool {component} is full: capacity {capacity}")]
    PoolFull {
        /// The component type whose pool is full.
        component: ComponentTypeId,
        /// The pool's fixed capacity.
        capacity: usize,
    },

    /// Registering another component type would exceed the signature width.
    #[error("too many component types: maximum is {max}")]
    TooManyComponentTypes {
        /// The compile-time ceiling.
        max: usize,
    },

    /// Registering another system would exceed the system ceiling.
    #[error("too many systems: maximum is {max}")]
    TooManySystems {
        /// The compile-time ceiling.
        max: usize,
    },

    /// A signature bit index outside the fixed width was used.
    #[error("component type id {0} is outside the signature width")]
    ComponentTypeOutOfRange(u8),

    /// No system is registered under this id.
    #[error("system not found: {0}")]
    SystemNotFound(usize),

    /// The pool stored under a type id does not hold the requested type.
    #[error("pool {0} holds a different component type")]
    PoolTypeMismatch(ComponentTypeId),

    /// Invalid configuration value or file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("i/o error: {0}")]
    Io(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
