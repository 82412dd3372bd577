//! # Generation Module
//!
//! Fill strategies for populating a region of a grid:
//! - Perlin noise for natural-looking terrain with caves and overhangs
//! - Random sparse fill
//! - Checkerboard pattern for testing
//! - Solid fill (every cell set)
//!
//! Every strategy writes through [`VoxelGrid::set`], so the tree stays pruned
//! and only touched regions are allocated.

use noise::{NoiseFn, Perlin};

use super::cell::CellValue;
use super::coord::{Coord, GridBounds};
use super::grid::VoxelGrid;
use crate::error::GridError;

/// Threshold above which Perlin noise is considered solid.
pub const PERLIN_POSITIVE_THRESHOLD: f64 = 0.2;
/// Threshold below which Perlin noise is considered solid.
pub const PERLIN_NEGATIVE_THRESHOLD: f64 = -0.2;
/// Scaling factor applied to cell coordinates when sampling Perlin noise.
pub const PERLIN_SCALE_FACTOR: f64 = 0.02;

/// Sets every cell in `bounds` to `value`.
///
/// # Returns
/// The number of cells written.
///
/// # Errors
/// Returns [`GridError::OutOfBounds`] if the box leaves the grid.
pub fn fill_solid<T: CellValue>(grid: &mut VoxelGrid<T>, bounds: GridBounds, value: T) -> Result<usize, GridError> {
    let mut written = 0;
    for coord in bounds.cells() {
        grid.set(coord, value)?;
        written += 1;
    }
    Ok(written)
}

/// Sets alternating cells in `bounds` to `value`, starting with the minimum corner.
///
/// # Returns
/// The number of cells written.
///
/// # Errors
/// Returns [`GridError::OutOfBounds`] if the box leaves the grid.
pub fn fill_checkerboard<T: CellValue>(
    grid: &mut VoxelGrid<T>,
    bounds: GridBounds,
    value: T,
) -> Result<usize, GridError> {
    let mut written = 0;
    for coord in bounds.cells() {
        if is_even_cell(coord, bounds.min) {
            grid.set(coord, value)?;
            written += 1;
        }
    }
    Ok(written)
}

/// Sets each cell in `bounds` with probability `density`, drawing values from `value`.
///
/// # Arguments
/// * `density` - Fraction of cells to fill, clamped to `0.0..=1.0`
/// * `rng` - Source of randomness; seed it for reproducible output
/// * `value` - Produces the value for each filled cell
///
/// # Errors
/// Returns [`GridError::OutOfBounds`] if a filled cell lies outside the grid.
pub fn fill_random<T: CellValue>(
    grid: &mut VoxelGrid<T>,
    bounds: GridBounds,
    density: f64,
    rng: &mut fastrand::Rng,
    mut value: impl FnMut(&mut fastrand::Rng) -> T,
) -> Result<usize, GridError> {
    let density = density.clamp(0.0, 1.0);
    let mut written = 0;
    for coord in bounds.cells() {
        if rng.f64() < density {
            let v = value(rng);
            grid.set(coord, v)?;
            written += 1;
        }
    }
    Ok(written)
}

/// Fills `bounds` with terrain sampled from 3D Perlin noise.
///
/// A cell is solid when the noise sample lies outside
/// `PERLIN_NEGATIVE_THRESHOLD..=PERLIN_POSITIVE_THRESHOLD`.
///
/// # Errors
/// Returns [`GridError::OutOfBounds`] if a solid cell lies outside the grid.
pub fn fill_perlin<T: CellValue>(
    grid: &mut VoxelGrid<T>,
    bounds: GridBounds,
    seed: u32,
    mut value: impl FnMut(Coord) -> T,
) -> Result<usize, GridError> {
    let perlin = Perlin::new(seed);
    let mut written = 0;
    for coord in bounds.cells() {
        let sample = perlin.get(to_perlin_pos(coord, PERLIN_SCALE_FACTOR));
        if !(PERLIN_NEGATIVE_THRESHOLD..=PERLIN_POSITIVE_THRESHOLD).contains(&sample) {
            grid.set(coord, value(coord))?;
            written += 1;
        }
    }
    Ok(written)
}

/// Whether `coord` lies an even Manhattan distance from `origin`.
fn is_even_cell(coord: Coord, origin: Coord) -> bool {
    let distance = (i64::from(coord.x) - i64::from(origin.x))
        + (i64::from(coord.y) - i64::from(origin.y))
        + (i64::from(coord.z) - i64::from(origin.z));
    distance % 2 == 0
}

fn to_perlin_pos(pos: Coord, scale_factor: f64) -> [f64; 3] {
    [
        pos.x as f64 * scale_factor,
        pos.y as f64 * scale_factor,
        pos.z as f64 * scale_factor,
    ]
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;
    use crate::voxels::material::Material;

    fn cube(edge: i32) -> GridBounds {
        GridBounds::new(Point3::new(0, 0, 0), Point3::new(edge - 1, edge - 1, edge - 1))
    }

    #[test]
    fn test_fill_solid() {
        let mut grid: VoxelGrid<u8> = VoxelGrid::new(1.0);
        assert_eq!(fill_solid(&mut grid, cube(10), 1).unwrap(), 1000);
        assert_eq!(grid.occupied_count(), 1000);
    }

    #[test]
    fn test_fill_checkerboard() {
        let mut grid: VoxelGrid<u8> = VoxelGrid::new(1.0);
        assert_eq!(fill_checkerboard(&mut grid, cube(4), 2).unwrap(), 32);
        assert_eq!(grid.get(Point3::new(0, 0, 0)), 2);
        assert_eq!(grid.get(Point3::new(1, 0, 0)), 0);
        assert_eq!(grid.get(Point3::new(1, 1, 0)), 2);
    }

    #[test]
    fn test_checkerboard_parity_spans_full_range() {
        let min = Point3::new(i32::MIN, i32::MIN, i32::MIN);
        assert!(is_even_cell(min, min));
        assert!(!is_even_cell(Point3::new(i32::MAX, i32::MIN, i32::MIN), min));
        assert!(is_even_cell(Point3::new(i32::MAX, i32::MAX, i32::MIN), min));
        assert!(!is_even_cell(Point3::new(i32::MAX, i32::MAX, i32::MAX), min));
    }

    #[test]
    fn test_checkerboard_on_full_width_layout() {
        let config = crate::config::GridConfig {
            resolution: 1.0,
            depth: 7,
            inner_bits: 4,
            leaf_bits: 4,
        };
        let mut grid: VoxelGrid<u8> = VoxelGrid::with_config(&config).unwrap();
        let bounds = GridBounds::new(Point3::new(i32::MAX - 1, i32::MIN, 0), Point3::new(i32::MAX, i32::MIN + 1, 0));
        assert_eq!(fill_checkerboard(&mut grid, bounds, 1).unwrap(), 2);
        assert_eq!(grid.get(Point3::new(i32::MAX - 1, i32::MIN, 0)), 1);
        assert_eq!(grid.get(Point3::new(i32::MAX, i32::MIN + 1, 0)), 1);
    }

    #[test]
    fn test_fill_random_is_reproducible() {
        let mut a: VoxelGrid<u8> = VoxelGrid::new(1.0);
        let mut b: VoxelGrid<u8> = VoxelGrid::new(1.0);
        let material = |rng: &mut fastrand::Rng| Material::random(rng).id();
        let na = fill_random(&mut a, cube(12), 0.1, &mut fastrand::Rng::with_seed(3), material).unwrap();
        let nb = fill_random(&mut b, cube(12), 0.1, &mut fastrand::Rng::with_seed(3), material).unwrap();
        assert_eq!(na, nb);
        assert_eq!(a, b);
        assert!(na > 0 && na < 12 * 12 * 12);
    }

    #[test]
    fn test_fill_perlin_matches_count() {
        let mut grid: VoxelGrid<u8> = VoxelGrid::new(1.0);
        let written = fill_perlin(&mut grid, cube(32), 0, |_| 1).unwrap();
        assert_eq!(grid.occupied_count(), written);
    }

    #[test]
    fn test_fill_out_of_bounds_errors() {
        let mut grid: VoxelGrid<u8> = VoxelGrid::new(1.0);
        let half = grid.layout().half_extent() as i32;
        let bounds = GridBounds::new(Point3::new(half - 1, 0, 0), Point3::new(half, 0, 0));
        assert!(matches!(fill_solid(&mut grid, bounds, 1), Err(GridError::OutOfBounds { .. })));
    }
}
