//! # Leaf Block Module
//!
//! This module provides the `LeafBlock` struct, the dense storage unit at the
//! finest resolution of the tree.
//!
//! ## Storage
//!
//! A leaf holds `2^(3 * leaf_bits)` cells in x-major order. It is allocated the
//! first time a cell in its region is written and is owned by exactly one
//! parent node. Emptiness is recomputed from the cells on every call rather
//! than tracked in a counter, so partial writes can never leave it stale.
//!
//! ### Performance Characteristics
//! - **Cell access**: O(1)
//! - **Emptiness check**: O(n) in the number of cells, early exit on the first occupied cell
//! - **Memory Usage**: `size_of::<T>()` per cell, occupied or not

use super::cell::{is_default, CellValue};

pub mod leaf_iteration;

use leaf_iteration::LeafCellIterator;

/// A dense cube of cells at the finest resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafBlock<T: CellValue> {
    cells: Box<[T]>,
}

impl<T: CellValue> LeafBlock<T> {
    /// Creates a block of `cell_count` default cells.
    pub fn new(cell_count: usize) -> Self {
        LeafBlock {
            cells: vec![T::default(); cell_count].into_boxed_slice(),
        }
    }

    /// Creates a block from an already populated cell array.
    ///
    /// Used by the deserializer, which decodes a full block before attaching it.
    pub fn from_cells(cells: Vec<T>) -> Self {
        LeafBlock {
            cells: cells.into_boxed_slice(),
        }
    }

    /// Creates a block where every cell holds `value`.
    pub fn filled(cell_count: usize, value: T) -> Self {
        LeafBlock {
            cells: vec![value; cell_count].into_boxed_slice(),
        }
    }

    /// Number of cells in the block, occupied or not.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Returns the value at `index`.
    ///
    /// # Panics
    /// Panics if `index` is not below [`cell_count`](Self::cell_count).
    #[inline]
    pub fn get(&self, index: usize) -> T {
        self.cells[index]
    }

    /// Stores `value` at `index` and returns the previous value.
    ///
    /// # Panics
    /// Panics if `index` is not below [`cell_count`](Self::cell_count).
    #[inline]
    pub fn set(&mut self, index: usize, value: T) -> T {
        std::mem::replace(&mut self.cells[index], value)
    }

    /// Returns `true` if every cell holds the default value.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(is_default)
    }

    /// Number of cells holding a non-default value.
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| !is_default(*c)).count()
    }

    /// Returns the shared value if every cell holds the same one.
    pub fn uniform_value(&self) -> Option<T> {
        let first = *self.cells.first()?;
        self.cells.iter().all(|c| *c == first).then_some(first)
    }

    /// The raw cell array in x-major order.
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    /// Iterates the occupied cells with their local positions.
    ///
    /// # Arguments
    /// * `leaf_bits` - Per-axis bit width the block was created with
    pub fn iter_occupied(&self, leaf_bits: u8) -> LeafCellIterator<'_, T> {
        LeafCellIterator::new(self, leaf_bits)
    }

    /// Approximate heap footprint of the block in bytes.
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + std::mem::size_of_val(&*self.cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_block_is_empty() {
        let leaf: LeafBlock<u16> = LeafBlock::new(64);
        assert_eq!(leaf.cell_count(), 64);
        assert!(leaf.is_empty());
        assert_eq!(leaf.occupied_count(), 0);
        assert_eq!(leaf.uniform_value(), Some(0));
    }

    #[test]
    fn test_set_get_and_emptiness() {
        let mut leaf: LeafBlock<u16> = LeafBlock::new(64);
        assert_eq!(leaf.set(10, 7), 0);
        assert_eq!(leaf.get(10), 7);
        assert!(!leaf.is_empty());
        assert_eq!(leaf.occupied_count(), 1);
        assert_eq!(leaf.uniform_value(), None);

        assert_eq!(leaf.set(10, 0), 7);
        assert!(leaf.is_empty());
    }

    #[test]
    fn test_emptiness_after_partial_overwrites() {
        let mut leaf: LeafBlock<f32> = LeafBlock::new(8);
        for i in 0..8 {
            leaf.set(i, 1.5);
        }
        for i in 0..7 {
            leaf.set(i, 0.0);
        }
        assert!(!leaf.is_empty());
        leaf.set(7, 0.0);
        assert!(leaf.is_empty());
    }

    #[test]
    fn test_filled_and_from_cells() {
        let leaf = LeafBlock::filled(8, 3u8);
        assert_eq!(leaf.uniform_value(), Some(3));
        let leaf = LeafBlock::from_cells(vec![0u8, 1, 0, 2]);
        assert_eq!(leaf.cells(), &[0, 1, 0, 2]);
        assert_eq!(leaf.occupied_count(), 2);
    }
}
