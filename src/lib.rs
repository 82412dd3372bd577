#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Sparse Voxel Grid
//!
//! A sparse voxel grid: a 3D map from integer cell coordinates to cell values
//! at a fixed world resolution, storing only the cells that differ from the
//! default value.
//!
//! ## Key Modules
//!
//! * `voxels` - The grid, its bitmask-indexed tree and leaf blocks
//! * `serialization` - Compact, self-describing binary encoding of a grid
//! * `occupancy` - A probabilistic occupancy layer built on the grid
//! * `core` - Sharing a grid between threads
//! * `config` - JSON-loadable grid configuration
//! * `error` - Error types
//!
//! ## Architecture
//!
//! Cells live in dense `LeafBlock`s at the finest level. Above them, inner
//! nodes hold an occupancy bitmask over their child slots and a compressed
//! list of only the populated children. Blocks and nodes are allocated on the
//! first write into a region and pruned again when the region empties.
//!
//! ## Usage
//!
//! ```rust
//! use cgmath::Point3;
//! use sparse_voxel_grid::{serialization, VoxelGrid};
//!
//! let mut grid: VoxelGrid<u8> = VoxelGrid::new(0.1);
//! grid.set(Point3::new(10, -3, 250), 2).unwrap();
//! assert_eq!(grid.get_at(Point3::new(1.05, -0.25, 25.01)), 2);
//!
//! let bytes = serialization::serialize(&grid);
//! let restored: VoxelGrid<u8> = serialization::deserialize(&bytes).unwrap();
//! assert_eq!(restored.occupied_count(), 1);
//! ```
//!
//! ## Performance Considerations
//!
//! * Reads never allocate; a missing region answers with the default value
//! * Child lookup is a popcount over the node mask, not a search
//! * `CachedReader` skips the descent for runs of lookups in one leaf block

pub mod config;
pub mod core;
pub mod error;
pub mod occupancy;
pub mod serialization;
pub mod voxels;

pub use crate::config::GridConfig;
pub use crate::core::SharedGrid;
pub use crate::error::{FormatError, GridError};
pub use crate::occupancy::{OccupancyCell, OccupancyMap, OccupancyOptions};
pub use crate::serialization::{deserialize, serialize};
pub use crate::voxels::accessor::CachedReader;
pub use crate::voxels::cell::CellValue;
pub use crate::voxels::coord::{Coord, GridBounds, GridLayout, RegionKey};
pub use crate::voxels::grid::VoxelGrid;
pub use crate::voxels::index::SpatialIndex;
pub use crate::voxels::leaf::LeafBlock;

/// Initializes `env_logger`, writing to stdout and filtered by `RUST_LOG`.
///
/// Call once, early, from a binary. Calling it twice panics.
pub fn init_logger() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();
}
