//! # World Configuration
//!
//! Compile-time ceilings plus the runtime [`WorldConfig`] loaded from TOML.
//!
//! **CRITICAL:** the constants below are baked into the binary. The signature
//! width in particular is a type-level property; raising it means rebuilding
//! every crate that stores a [`Signature`](crate::Signature).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

// =============================================================================
// CAPACITY CEILINGS
// =============================================================================

/// Maximum number of distinct component types a world can register.
///
/// Equals the bit width of a [`Signature`](crate::Signature).
pub const MAX_COMPONENT_TYPES: usize = 32;

/// Maximum number of live components of one type at once.
pub const MAX_ENTITIES_PER_COMPONENT_TYPE: usize = 256;

/// Initial entity reservation for the registry. Not a hard ceiling.
pub const MAX_ENTITIES: usize = 512;

/// Maximum number of systems a world can run.
pub const MAX_SYSTEMS: usize = 32;

// =============================================================================
// RUNTIME CONFIGURATION
// =============================================================================

/// Runtime sizing for a [`World`](crate::World).
///
/// Missing keys fall back to the compile-time defaults.
///
/// ```toml
/// entity_reserve = 1024
/// pool_capacity = 128
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// How many entity slots the registry reserves up front.
    pub entity_reserve: usize,
    /// Live components allowed per component type.
    ///
    /// May be lowered below [`MAX_ENTITIES_PER_COMPONENT_TYPE`], never raised.
    pub pool_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            entity_reserve: MAX_ENTITIES,
            pool_capacity: MAX_ENTITIES_PER_COMPONENT_TYPE,
        }
    }
}

impl WorldConfig {
    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] on malformed TOML or out-of-range values.
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Io`] if the file cannot be read, otherwise the
    /// errors of [`WorldConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EcsError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks every value against the compile-time ceilings.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] describing the first bad value.
    pub fn validate(&self) -> EcsResult<()> {
        if self.entity_reserve == 0 {
            return Err(EcsError::InvalidConfig(
                "entity_reserve must be greater than zero".into(),
            ));
        }
        if self.pool_capacity == 0 {
            return Err(EcsError::InvalidConfig(
                "pool_capacity must be greater than zero".into(),
            ));
        }
        if self.pool_capacity > MAX_ENTITIES_PER_COMPONENT_TYPE {
            return Err(EcsError::InvalidConfig(format!(
                "pool_capacity {} exceeds the maximum of {MAX_ENTITIES_PER_COMPONENT_TYPE}",
                self.pool_capacity
            )));
        }
        Ok(())
    }
}
