//! # Core Module
//!
//! Concurrency primitives for sharing a grid between threads. The grid itself
//! has no internal locking; `SharedGrid` supplies it from the outside.
//!
//! ## Usage
//! ```rust
//! use cgmath::Point3;
//! use sparse_voxel_grid::{core::SharedGrid, VoxelGrid};
//!
//! let shared = SharedGrid::new(VoxelGrid::<u8>::new(0.5));
//! shared.write().unwrap().set(Point3::new(0, 0, 0), 1).unwrap();
//! let copy = shared.snapshot().unwrap();
//! assert_eq!(copy.occupied_count(), 1);
//! ```

pub mod shared_grid;

pub use shared_grid::SharedGrid;
