//! # Registry Configuration
//!
//! Reserve hints for a [`Registry`](crate::Registry), loaded once at startup.
//!
//! ```toml
//! entity_capacity = 65536
//! storage_capacity = 1024
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ecs::DEFAULT_ENTITY_CAPACITY;
use crate::error::{EcsError, EcsResult};

/// Capacity hints applied when a registry and its storages are created.
///
/// Hints only affect up-front allocation; every structure still grows on
/// demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Slots reserved in the entity allocator.
    pub entity_capacity: usize,
    /// Components reserved in each storage when it is first created.
    pub storage_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            entity_capacity: DEFAULT_ENTITY_CAPACITY,
            storage_capacity: 0,
        }
    }
}

impl RegistryConfig {
    /// Parses a configuration from TOML text. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the text is not valid TOML or
    /// contains unknown keys or mistyped values.
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        toml::from_str(text).map_err(|err| EcsError::InvalidConfig(err.to_string()))
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the file cannot be read or parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| EcsError::InvalidConfig(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
