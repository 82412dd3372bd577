//! # Voxel Grid Module
//!
//! This module provides the `VoxelGrid` struct, the top-level container that
//! pairs a `SpatialIndex` with a world-space resolution.
//!
//! ## Coordinate Systems
//!
//! World positions are continuous `f64` points. Cell coordinates are discrete
//! `i32` points. A world position maps to the cell whose minimum corner lies at
//! `floor(p / resolution)`, and a cell maps back to that minimum corner.

use cgmath::Point3;
use log::debug;

use super::accessor::CachedReader;
use super::cell::CellValue;
use super::coord::{Coord, GridBounds, GridLayout};
use super::index::index_iteration::OccupiedIter;
use super::index::{SpatialIndex, TreeStats};
use crate::config::GridConfig;
use crate::error::GridError;

/// A sparse 3D grid of cell values at a fixed resolution.
///
/// # Examples
///
/// ```
/// use cgmath::Point3;
/// use sparse_voxel_grid::VoxelGrid;
///
/// let mut grid: VoxelGrid<u8> = VoxelGrid::new(0.5);
/// grid.set(Point3::new(1, 2, 3), 7).unwrap();
/// assert_eq!(grid.get(Point3::new(1, 2, 3)), 7);
/// assert_eq!(grid.get_at(Point3::new(0.6, 1.2, 1.7)), 7);
///
/// grid.erase(Point3::new(1, 2, 3));
/// assert!(grid.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid<T: CellValue> {
    resolution: f64,
    inv_resolution: f64,
    index: SpatialIndex<T>,
}

impl<T: CellValue> VoxelGrid<T> {
    /// Creates an empty grid with the default tree shape.
    ///
    /// A non-positive or non-finite resolution is replaced by its absolute
    /// value, clamped to at least `f64::EPSILON`. Use [`try_new`](Self::try_new)
    /// to reject it instead.
    pub fn new(resolution: f64) -> Self {
        let resolution = if resolution.is_finite() {
            resolution.abs().max(f64::EPSILON)
        } else {
            crate::config::DEFAULT_RESOLUTION
        };
        Self::from_parts(resolution, SpatialIndex::new(GridLayout::default()))
    }

    /// Creates an empty grid, rejecting an invalid resolution.
    ///
    /// # Errors
    /// Returns [`GridError::InvalidResolution`] if `resolution` is not positive and finite.
    pub fn try_new(resolution: f64) -> Result<Self, GridError> {
        Self::with_config(&GridConfig::with_resolution(resolution))
    }

    /// Creates an empty grid from a full configuration.
    ///
    /// # Errors
    /// Returns the validation error of [`GridConfig::validate`].
    pub fn with_config(config: &GridConfig) -> Result<Self, GridError> {
        let layout = config.validate()?;
        debug!(
            "creating grid: resolution {}, depth {}, {} slots per node, {} cells per leaf",
            config.resolution,
            layout.depth(),
            layout.inner_slots(),
            layout.leaf_cells()
        );
        Ok(Self::from_parts(config.resolution, SpatialIndex::new(layout)))
    }

    pub(crate) fn from_parts(resolution: f64, index: SpatialIndex<T>) -> Self {
        VoxelGrid {
            resolution,
            inv_resolution: 1.0 / resolution,
            index,
        }
    }

    /// Cell edge length in world units.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Number of inner tree levels.
    pub fn depth(&self) -> u8 {
        self.index.layout().depth()
    }

    /// The tree shape.
    pub fn layout(&self) -> GridLayout {
        self.index.layout()
    }

    /// The configuration this grid was built from.
    pub fn config(&self) -> GridConfig {
        let layout = self.layout();
        GridConfig {
            resolution: self.resolution,
            depth: layout.depth(),
            inner_bits: layout.inner_bits(),
            leaf_bits: layout.leaf_bits(),
        }
    }

    /// The underlying sparse index.
    pub fn index(&self) -> &SpatialIndex<T> {
        &self.index
    }

    /// Converts a world position to the coordinate of the cell containing it.
    ///
    /// # Returns
    /// `None` if the position is not finite or its cell lies beyond the `i32` range.
    pub fn world_to_coord(&self, position: Point3<f64>) -> Option<Coord> {
        let axis = |v: f64| {
            let cell = (v * self.inv_resolution).floor();
            (cell.is_finite() && cell >= i32::MIN as f64 && cell <= i32::MAX as f64).then_some(cell as i32)
        };
        Some(Point3::new(axis(position.x)?, axis(position.y)?, axis(position.z)?))
    }

    /// Converts a cell coordinate to the world position of its minimum corner.
    pub fn coord_to_world(&self, coord: Coord) -> Point3<f64> {
        Point3::new(
            coord.x as f64 * self.resolution,
            coord.y as f64 * self.resolution,
            coord.z as f64 * self.resolution,
        )
    }

    /// Returns the value at `coord`, or the default.
    pub fn get(&self, coord: Coord) -> T {
        self.index.get(coord)
    }

    /// Stores `value` at `coord`.
    ///
    /// # Returns
    /// The previous non-default value, if any.
    ///
    /// # Errors
    /// Returns [`GridError::OutOfBounds`] if `coord` is outside the grid.
    pub fn set(&mut self, coord: Coord, value: T) -> Result<Option<T>, GridError> {
        self.index.set(coord, value)
    }

    /// Resets the cell at `coord` to default, pruning emptied regions.
    pub fn erase(&mut self, coord: Coord) -> Option<T> {
        self.index.erase(coord)
    }

    /// Returns the value of the cell containing a world position.
    ///
    /// Non-finite positions read as default.
    pub fn get_at(&self, position: Point3<f64>) -> T {
        self.world_to_coord(position)
            .map(|coord| self.get(coord))
            .unwrap_or_default()
    }

    /// Stores `value` in the cell containing a world position.
    ///
    /// # Errors
    /// Returns [`GridError::InvalidPosition`] if the position does not map to a cell and
    /// [`GridError::OutOfBounds`] if the position is outside the grid.
    pub fn set_at(&mut self, position: Point3<f64>, value: T) -> Result<Option<T>, GridError> {
        let coord = self.world_to_coord(position).ok_or(GridError::InvalidPosition {
            position: [position.x, position.y, position.z],
        })?;
        self.set(coord, value)
    }

    /// Erases the cell containing a world position; a no-op for non-finite positions.
    pub fn erase_at(&mut self, position: Point3<f64>) -> Option<T> {
        let coord = self.world_to_coord(position)?;
        self.erase(coord)
    }

    /// Lazily iterates every occupied cell.
    pub fn iter(&self) -> OccupiedIter<'_, T> {
        self.index.iter()
    }

    /// Calls `callback` for every occupied cell.
    pub fn for_each_occupied(&self, callback: impl FnMut(Coord, T)) {
        self.index.for_each_occupied(callback)
    }

    /// A read accessor that caches the last visited leaf block.
    pub fn reader(&self) -> CachedReader<'_, T> {
        CachedReader::new(&self.index)
    }

    /// Returns `true` if no cell is occupied.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Removes every cell.
    pub fn clear(&mut self) {
        self.index.clear()
    }

    /// Node, leaf, cell and memory counters.
    pub fn stats(&self) -> TreeStats {
        let mut stats = self.index.stats();
        stats.memory_bytes += std::mem::size_of::<Self>() - std::mem::size_of::<SpatialIndex<T>>();
        stats
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.index.occupied_count()
    }

    /// Number of allocated leaf blocks.
    pub fn leaf_count(&self) -> usize {
        self.index.leaf_count()
    }

    /// Approximate heap footprint in bytes.
    pub fn memory_usage(&self) -> usize {
        self.stats().memory_bytes
    }

    /// Smallest box containing every occupied cell.
    pub fn bounds(&self) -> Option<GridBounds> {
        self.index.bounds()
    }
}

impl<'a, T: CellValue> IntoIterator for &'a VoxelGrid<T> {
    type Item = (Coord, T);
    type IntoIter = OccupiedIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sanitizes_resolution() {
        let grid: VoxelGrid<u8> = VoxelGrid::new(-0.5);
        assert_eq!(grid.resolution(), 0.5);
        let grid: VoxelGrid<u8> = VoxelGrid::new(f64::INFINITY);
        assert_eq!(grid.resolution(), crate::config::DEFAULT_RESOLUTION);
    }

    #[test]
    fn test_try_new_rejects_bad_resolution() {
        assert!(matches!(
            VoxelGrid::<u8>::try_new(-1.0),
            Err(GridError::InvalidResolution(_))
        ));
        assert!(VoxelGrid::<u8>::try_new(0.1).is_ok());
    }

    #[test]
    fn test_world_conversion() {
        let grid: VoxelGrid<u8> = VoxelGrid::new(0.5);
        assert_eq!(grid.world_to_coord(Point3::new(0.0, 0.49, 0.5)), Some(Point3::new(0, 0, 1)));
        assert_eq!(grid.world_to_coord(Point3::new(-0.01, -0.5, -0.51)), Some(Point3::new(-1, -1, -2)));
        assert_eq!(grid.coord_to_world(Point3::new(-2, 0, 3)), Point3::new(-1.0, 0.0, 1.5));
        let c = Point3::new(7, -3, 12);
        assert_eq!(grid.world_to_coord(grid.coord_to_world(c)), Some(c));
    }

    #[test]
    fn test_non_finite_positions_map_nowhere() {
        let grid: VoxelGrid<u8> = VoxelGrid::new(0.5);
        assert_eq!(grid.world_to_coord(Point3::new(f64::NAN, 0.0, 0.0)), None);
        assert_eq!(grid.world_to_coord(Point3::new(0.0, f64::INFINITY, 0.0)), None);
        assert_eq!(grid.world_to_coord(Point3::new(0.0, 0.0, f64::NEG_INFINITY)), None);
        assert_eq!(grid.world_to_coord(Point3::new(1e12, 0.0, 0.0)), None);
    }

    #[test]
    fn test_non_finite_world_accessors_leave_origin_alone() {
        let config = GridConfig {
            resolution: 1.0,
            depth: 7,
            inner_bits: 4,
            leaf_bits: 4,
        };
        let mut grid: VoxelGrid<u8> = VoxelGrid::with_config(&config).unwrap();
        grid.set(Point3::new(0, 0, 0), 3).unwrap();
        let nan = Point3::new(f64::NAN, f64::NAN, f64::NAN);

        assert!(matches!(grid.set_at(nan, 5), Err(GridError::InvalidPosition { .. })));
        assert!(matches!(
            grid.set_at(Point3::new(f64::INFINITY, 0.0, 0.0), 5),
            Err(GridError::InvalidPosition { .. })
        ));
        assert_eq!(grid.erase_at(nan), None);
        assert_eq!(grid.get_at(nan), 0);
        assert_eq!(grid.get(Point3::new(0, 0, 0)), 3);
        assert_eq!(grid.occupied_count(), 1);
    }

    #[test]
    fn test_world_accessors() {
        let mut grid: VoxelGrid<f32> = VoxelGrid::new(0.25);
        grid.set_at(Point3::new(1.1, -0.3, 0.0), 2.5).unwrap();
        assert_eq!(grid.get(Point3::new(4, -2, 0)), 2.5);
        assert_eq!(grid.get_at(Point3::new(1.01, -0.26, 0.2)), 2.5);
        assert_eq!(grid.erase_at(Point3::new(1.2, -0.4, 0.1)), Some(2.5));
        assert!(grid.is_empty());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = GridConfig {
            resolution: 0.2,
            depth: 3,
            inner_bits: 3,
            leaf_bits: 2,
        };
        let grid: VoxelGrid<u16> = VoxelGrid::with_config(&config).unwrap();
        assert_eq!(grid.config(), config);
        assert_eq!(grid.depth(), 3);
    }

    #[test]
    fn test_stats_and_iteration() {
        let mut grid: VoxelGrid<u32> = VoxelGrid::new(1.0);
        for i in 0..20 {
            grid.set(Point3::new(i * 3, -i, i), i as u32 + 1).unwrap();
        }
        let stats = grid.stats();
        assert_eq!(stats.occupied, 20);
        assert_eq!(stats.leaves, grid.leaf_count());
        assert_eq!((&grid).into_iter().count(), 20);
        let bounds = grid.bounds().unwrap();
        assert_eq!(bounds.min, Point3::new(0, -19, 0));
        assert_eq!(bounds.max, Point3::new(57, 0, 19));
        grid.clear();
        assert_eq!(grid.occupied_count(), 0);
    }
}
