//! # Voxels
//!
//! This module contains the sparse voxel grid itself.
//!
//! ## Architecture
//!
//! The grid is organized into several key components, in dependency order:
//!
//! * **Leaf**: dense fixed-size blocks of cells at the finest resolution
//! * **Index**: the bitmask-indexed tree mapping coordinates to leaf blocks
//! * **Grid**: the `VoxelGrid` container adding world-space resolution
//! * **Accessor**: cached reads for runs of nearby lookups
//! * **Generation**: fill strategies for populating regions
//!
//! ## Thread Safety
//!
//! The tree has no internal locking. A grid may be read from many threads at
//! once, but mutation needs exclusive access; see [`crate::core::SharedGrid`]
//! for a single-writer wrapper.

pub mod accessor;
pub mod cell;
pub mod coord;
pub mod generation;
pub mod grid;
pub mod index;
pub mod leaf;
pub mod material;
