//! # Leaf Iteration Module
//!
//! An iterator over the occupied cells of a single `LeafBlock`, yielding each
//! value together with its position inside the block.

use cgmath::Point3;

use crate::voxels::cell::{is_default, CellValue};

use super::LeafBlock;

/// An iterator over all non-default cells in a leaf block.
///
/// The iterator walks the dense cell array once, tracking the local position
/// alongside the linear offset so no division is needed per cell.
pub struct LeafCellIterator<'a, T: CellValue> {
    /// The block being iterated
    leaf_ref: &'a LeafBlock<T>,
    /// Next linear offset into the cell array
    offset: usize,
    /// Cells per axis
    dim: u32,
    /// Local X of `offset`
    local_x: u32,
    /// Local Y of `offset`
    local_y: u32,
    /// Local Z of `offset`
    local_z: u32,
}

impl<'a, T: CellValue> LeafCellIterator<'a, T> {
    /// Creates an iterator positioned before the first cell of `leaf_ref`.
    ///
    /// # Arguments
    /// * `leaf_ref` - The block to iterate
    /// * `leaf_bits` - Per-axis bit width of the block
    pub fn new(leaf_ref: &'a LeafBlock<T>, leaf_bits: u8) -> Self {
        LeafCellIterator {
            leaf_ref,
            offset: 0,
            dim: 1 << leaf_bits,
            local_x: 0,
            local_y: 0,
            local_z: 0,
        }
    }

    fn advance(&mut self) {
        self.offset += 1;
        self.local_x += 1;
        if self.local_x == self.dim {
            self.local_x = 0;
            self.local_y += 1;
            if self.local_y == self.dim {
                self.local_y = 0;
                self.local_z += 1;
            }
        }
    }
}

impl<T: CellValue> Iterator for LeafCellIterator<'_, T> {
    type Item = (Point3<u32>, T);

    fn next(&mut self) -> Option<Self::Item> {
        let cells = self.leaf_ref.cells();
        while self.offset < cells.len() {
            let value = cells[self.offset];
            let position = Point3::new(self.local_x, self.local_y, self.local_z);
            self.advance();
            if !is_default(&value) {
                return Some((position, value));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iterates_only_occupied_cells() {
        let mut leaf: LeafBlock<u8> = LeafBlock::new(8);
        leaf.set(0, 1);
        leaf.set(3, 2);
        leaf.set(7, 3);
        let cells: Vec<_> = leaf.iter_occupied(1).collect();
        assert_eq!(
            cells,
            vec![
                (Point3::new(0, 0, 0), 1),
                (Point3::new(1, 1, 0), 2),
                (Point3::new(1, 1, 1), 3),
            ]
        );
    }

    #[test]
    fn test_empty_leaf_yields_nothing() {
        let leaf: LeafBlock<u32> = LeafBlock::new(512);
        assert_eq!(leaf.iter_occupied(3).count(), 0);
    }

    #[test]
    fn test_local_position_matches_linear_index() {
        let mut leaf: LeafBlock<u16> = LeafBlock::new(512);
        let index = 5 | (6 << 3) | (2 << 6);
        leaf.set(index, 9);
        let (pos, value) = leaf.iter_occupied(3).next().unwrap();
        assert_eq!(pos, Point3::new(5, 6, 2));
        assert_eq!(value, 9);
    }
}
