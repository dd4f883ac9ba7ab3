//! Data-only store configuration.
//!
//! Everything that can be expressed as plain values lives in [`StoreConfig`],
//! which can be loaded from TOML:
//!
//! ```
//! use horizon_rowstore::StoreConfig;
//!
//! let config = StoreConfig::from_toml_str(r#"
//! row_height = 32.0
//! group_levels = 2
//! "#).unwrap();
//!
//! assert_eq!(config.row_height, 32.0);
//! assert_eq!(config.group_levels, 2);
//! ```
//!
//! Behavioral collaborators (datasource, filter, sort keys, callbacks) are
//! supplied through [`StoreParams`](crate::StoreParams).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default pixel height of a row.
pub const DEFAULT_ROW_HEIGHT: f64 = 25.0;

/// Plain configuration shared by every store in a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Height in pixels of rows that have no height callback result.
    pub row_height: f64,
    /// Number of row-grouping levels. Stores at a level below this hold group
    /// rows; `0` means a flat list of leaf rows.
    pub group_levels: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            row_height: DEFAULT_ROW_HEIGHT,
            group_levels: 0,
        }
    }
}

impl StoreConfig {
    /// Parse and validate a configuration from TOML text.
    ///
    /// Missing keys take their default values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: StoreConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<()> {
        if !self.row_height.is_finite() || self.row_height <= 0.0 {
            return Err(Error::invalid_config(
                "row_height",
                format!("expected a positive number of pixels, got {}", self.row_height),
            ));
        }
        Ok(())
    }

    /// Returns `true` if stores at `level` hold group rows.
    pub fn is_group_level(&self, level: usize) -> bool {
        level < self.group_levels
    }

    /// Returns `true` if `level` is the last grouping level before leaf rows.
    pub fn is_leaf_group_level(&self, level: usize) -> bool {
        self.group_levels > 0 && level == self.group_levels - 1
    }
}
