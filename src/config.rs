//! # Config Module
//!
//! `GridConfig` describes a grid's resolution and tree shape. It deserializes
//! from JSON with every field optional, so `{}` yields the defaults.
//!
//! ```
//! use sparse_voxel_grid::GridConfig;
//!
//! let config = GridConfig::from_json_str(r#"{ "resolution": 0.05, "depth": 3 }"#).unwrap();
//! assert_eq!(config.depth, 3);
//! assert_eq!(config.leaf_bits, 3);
//! ```

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::GridError;
use crate::voxels::coord::GridLayout;

/// Default cell edge length in world units.
pub const DEFAULT_RESOLUTION: f64 = 0.1;
/// Default number of inner levels.
pub const DEFAULT_DEPTH: u8 = 4;
/// Default per-axis bits of an inner node (4×4×4 children).
pub const DEFAULT_INNER_BITS: u8 = 2;
/// Default per-axis bits of a leaf block (8×8×8 cells).
pub const DEFAULT_LEAF_BITS: u8 = 3;

/// Resolution and tree shape of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Cell edge length in world units.
    pub resolution: f64,
    /// Number of inner node levels above the leaf blocks.
    pub depth: u8,
    /// Per-axis bit width of an inner node.
    pub inner_bits: u8,
    /// Per-axis bit width of a leaf block.
    pub leaf_bits: u8,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            resolution: DEFAULT_RESOLUTION,
            depth: DEFAULT_DEPTH,
            inner_bits: DEFAULT_INNER_BITS,
            leaf_bits: DEFAULT_LEAF_BITS,
        }
    }
}

impl GridConfig {
    /// Default shape with the given resolution.
    pub fn with_resolution(resolution: f64) -> Self {
        GridConfig {
            resolution,
            ..Default::default()
        }
    }

    /// Parses a config from JSON text.
    ///
    /// # Errors
    /// Returns [`GridError::ConfigParse`] on malformed JSON. The result is not
    /// validated; call [`validate`](Self::validate) or build a grid from it.
    pub fn from_json_str(json: &str) -> Result<Self, GridError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a config from a JSON reader.
    ///
    /// # Errors
    /// Returns [`GridError::ConfigParse`] on malformed JSON or read failure.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, GridError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Checks the resolution and tree shape.
    ///
    /// # Returns
    /// The validated tree layout.
    ///
    /// # Errors
    /// Returns [`GridError::InvalidResolution`] or [`GridError::InvalidLayout`].
    pub fn validate(&self) -> Result<GridLayout, GridError> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(GridError::InvalidResolution(self.resolution));
        }
        GridLayout::new(self.depth, self.inner_bits, self.leaf_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = GridConfig::from_json_str("{}").unwrap();
        assert_eq!(config, GridConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = GridConfig::from_json_str(r#"{"inner_bits": 3, "leaf_bits": 2}"#).unwrap();
        assert_eq!(config.inner_bits, 3);
        assert_eq!(config.leaf_bits, 2);
        assert_eq!(config.depth, DEFAULT_DEPTH);
        assert_eq!(config.validate().unwrap().inner_slots(), 512);
    }

    #[test]
    fn test_malformed_json() {
        let err = GridConfig::from_json_str(r#"{"depth": "deep"}"#).unwrap_err();
        assert!(matches!(err, GridError::ConfigParse(_)));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            GridConfig::with_resolution(0.0).validate(),
            Err(GridError::InvalidResolution(_))
        ));
        assert!(matches!(
            GridConfig::with_resolution(f64::NAN).validate(),
            Err(GridError::InvalidResolution(_))
        ));
        let config = GridConfig {
            depth: 9,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(GridError::InvalidLayout { .. })));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = GridConfig {
            resolution: 0.25,
            depth: 2,
            inner_bits: 1,
            leaf_bits: 4,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(GridConfig::from_json_reader(json.as_bytes()).unwrap(), config);
    }
}
