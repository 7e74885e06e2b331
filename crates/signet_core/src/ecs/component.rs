//! # Component Types
//!
//! Components are plain data with no behavior. Each type is registered once
//! with the world, which hands out a stable [`ComponentTypeId`] used as its
//! signature bit and as the index of its pool.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::config::MAX_COMPONENT_TYPES;
use crate::error::{EcsError, EcsResult};

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Default`: pools reset vacated slots to the default value
/// - `'static`: pools are stored type-erased and recovered by type
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Debug, Default, PartialEq)]
/// struct Position {
///     x: f32,
///     y: f32,
/// }
///
/// impl Component for Position {}
/// ```
pub trait Component: Default + 'static {}

/// Stable identifier of a registered component type.
///
/// Always below [`MAX_COMPONENT_TYPES`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentTypeId(u8);

impl ComponentTypeId {
    /// Creates an id from its raw value.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentTypeOutOfRange`] if `raw` does not fit the
    /// signature width.
    pub fn new(raw: u8) -> EcsResult<Self> {
        if usize::from(raw) < MAX_COMPONENT_TYPES {
            Ok(Self(raw))
        } else {
            Err(EcsError::ComponentTypeOutOfRange(raw))
        }
    }

    /// Caller guarantees `raw < MAX_COMPONENT_TYPES`.
    #[inline]
    pub(crate) const fn from_index(raw: u8) -> Self {
        Self(raw)
    }

    /// Returns the id as an index into per-type tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw id value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Assigns component type ids in registration order.
///
/// Registration is explicit and happens on the world, so ids are
/// deterministic for a given setup sequence.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    /// Rust type to assigned id.
    ids: HashMap<TypeId, ComponentTypeId>,
    /// Type names indexed by id.
    names: Vec<&'static str>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: HashMap::with_capacity(MAX_COMPONENT_TYPES),
            names: Vec::with_capacity(MAX_COMPONENT_TYPES),
        }
    }

    /// Registers `T`, or returns its existing id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TooManyComponentTypes`] once every signature bit is
    /// taken.
    pub fn register<T: Component>(&mut self) -> EcsResult<ComponentTypeId> {
        if let Some(&id) = self.ids.get(&TypeId::of::<T>()) {
            return Ok(id);
        }
        let next = self.names.len();
        let raw = u8::try_from(next)
            .ok()
            .filter(|_| next < MAX_COMPONENT_TYPES)
            .ok_or(EcsError::TooManyComponentTypes {
                max: MAX_COMPONENT_TYPES,
            })?;

        let id = ComponentTypeId::from_index(raw);
        self.ids.insert(TypeId::of::<T>(), id);
        self.names.push(type_name::<T>());
        Ok(id)
    }

    /// Looks up the id of a registered type.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredComponent`] if `T` was never registered.
    pub fn id_of<T: Component>(&self) -> EcsResult<ComponentTypeId> {
        self.ids
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(EcsError::UnregisteredComponent(type_name::<T>()))
    }

    /// Returns the type name registered under `id`.
    #[must_use]
    pub fn name(&self, id: ComponentTypeId) -> Option<&'static str> {
        self.names.get(id.index()).copied()
    }

    /// Number of registered component types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Checks whether nothing has been registered yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
