//! # Accessor Module
//!
//! `CachedReader` speeds up runs of nearby lookups by remembering the leaf
//! block of the previous lookup. Neighbouring cells usually share a block, so
//! most reads skip the descent from the root entirely.

use super::cell::CellValue;
use super::coord::{Coord, RegionKey};
use super::index::SpatialIndex;
use super::leaf::LeafBlock;

/// A read-only accessor with a one-entry leaf cache.
///
/// The reader borrows the index, so the grid cannot be mutated while it is alive
/// and the cache can never go stale.
///
/// # Examples
///
/// ```
/// use cgmath::Point3;
/// use sparse_voxel_grid::VoxelGrid;
///
/// let mut grid: VoxelGrid<u8> = VoxelGrid::new(1.0);
/// grid.set(Point3::new(0, 0, 0), 1).unwrap();
///
/// let mut reader = grid.reader();
/// assert_eq!(reader.get(Point3::new(0, 0, 0)), 1);
/// assert_eq!(reader.get(Point3::new(1, 0, 0)), 0);
/// assert_eq!(reader.cache_hits(), 1);
/// ```
pub struct CachedReader<'a, T: CellValue> {
    index: &'a SpatialIndex<T>,
    /// Last looked-up leaf region and the block found there, if any
    cached: Option<(RegionKey, Option<&'a LeafBlock<T>>)>,
    hits: u64,
    misses: u64,
}

impl<'a, T: CellValue> CachedReader<'a, T> {
    /// Creates a reader with an empty cache.
    pub fn new(index: &'a SpatialIndex<T>) -> Self {
        CachedReader {
            index,
            cached: None,
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the value at `coord`, or the default.
    pub fn get(&mut self, coord: Coord) -> T {
        let layout = self.index.layout();
        let Some(biased) = layout.to_biased(coord) else {
            return T::default();
        };
        let key = RegionKey::from_biased(biased, 0, layout.region_bits(0));

        let cached = self.cached;
        let leaf = match cached {
            Some((cached_key, leaf)) if cached_key == key => {
                self.hits += 1;
                leaf
            }
            _ => {
                self.misses += 1;
                let leaf = self.index.find_leaf(biased);
                self.cached = Some((key, leaf));
                leaf
            }
        };
        leaf.map(|leaf| leaf.get(layout.leaf_index(biased)))
            .unwrap_or_default()
    }

    /// Lookups answered from the cache.
    pub fn cache_hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that descended the tree.
    pub fn cache_misses(&self) -> u64 {
        self.misses
    }
}
