//! # Store Configuration
//!
//! Settings are resolved by the integrator and passed to the store builder;
//! the store reads nothing from global state. A config file is loaded once
//! at startup:
//!
//! ```toml
//! entities_capacity = 50000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

/// Default number of entity slots.
pub const DEFAULT_ENTITIES_CAPACITY: usize = 10_000;

/// Configuration for a [`Store`](crate::Store).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of entity slots, fixed for the store's lifetime.
    pub entities_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            entities_capacity: DEFAULT_ENTITIES_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Config with the given capacity.
    #[must_use]
    pub const fn with_capacity(entities_capacity: usize) -> Self {
        Self { entities_capacity }
    }

    /// Parses a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if the document does not parse or the
    /// values are out of range.
    pub fn from_toml_str(source: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| EcsError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Checks the values are usable.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if the capacity is zero or exceeds
    /// `u32::MAX`.
    pub fn validate(&self) -> EcsResult<()> {
        if self.entities_capacity == 0 {
            return Err(EcsError::InvalidConfig(
                "entities_capacity must be greater than zero".into(),
            ));
        }
        if u32::try_from(self.entities_capacity).is_err() {
            return Err(EcsError::InvalidConfig(format!(
                "entities_capacity {} exceeds u32::MAX",
                self.entities_capacity
            )));
        }
        Ok(())
    }
}
