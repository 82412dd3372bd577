//! # Spatial Index Module
//!
//! This module provides the `SpatialIndex`, a hierarchical sparse tree mapping
//! cell coordinates to values. Empty regions are omitted entirely.
//!
//! ## Node Storage
//!
//! Each inner node stores its children the same way a sparse chunk stores
//! blocks:
//! - `mask`: a bit vector with one bit per child slot, set when the slot is populated
//! - `children`: only the populated children, in slot order
//!
//! The child for slot `s` therefore lives at index `mask[..s].count_ones()` in
//! `children`. For a node with only two populated slots the storage would be:
//! - `mask`: `0100...0010` (one bit per slot)
//! - `children`: `[child_a, child_b]`
//!
//! ## Tree Shape
//!
//! The root sits at level `depth` and always exists. Nodes at level 1 hold
//! `LeafBlock`s, nodes above hold further inner nodes. Reads never allocate;
//! writes allocate the missing path from root to leaf; erases prune every node
//! that becomes empty on the way back up, stopping at the root.
//!
//! ### Performance Characteristics
//! - **Lookup / write / erase**: O(depth) node visits
//! - **Iteration**: O(nodes + leaf cells)
//! - **Memory Usage**: one bit per slot plus one pointer per populated child per node

use bitvec::prelude::*;
use log::{debug, trace};

use super::cell::{is_default, CellValue};
use super::coord::{Biased, Coord, GridBounds, GridLayout, RegionKey};
use super::leaf::LeafBlock;
use crate::error::GridError;

pub mod index_iteration;

use index_iteration::OccupiedIter;

/// A populated child slot of an inner node.
#[derive(Debug, Clone, PartialEq)]
pub enum Child<T: CellValue> {
    /// A further inner node (levels above 1).
    Node(Box<InnerNode<T>>),
    /// A leaf block (children of level-1 nodes).
    Leaf(Box<LeafBlock<T>>),
}

/// An inner node of the tree: occupancy mask plus compressed children.
#[derive(Debug, Clone, PartialEq)]
pub struct InnerNode<T: CellValue> {
    mask: BitVec,
    children: Vec<Child<T>>,
}

impl<T: CellValue> InnerNode<T> {
    /// Creates a node with `slots` empty child slots.
    pub fn new(slots: usize) -> Self {
        InnerNode {
            mask: bitvec![0; slots],
            children: Vec::new(),
        }
    }

    /// Builds a node from a mask and its children in slot order.
    ///
    /// The caller guarantees `children.len() == mask.count_ones()`.
    pub(crate) fn from_parts(mask: BitVec, children: Vec<Child<T>>) -> Self {
        debug_assert_eq!(mask.count_ones(), children.len());
        InnerNode { mask, children }
    }

    /// The occupancy mask, one bit per child slot.
    pub fn mask(&self) -> &BitSlice {
        &self.mask
    }

    /// Populated children in slot order.
    pub fn children(&self) -> &[Child<T>] {
        &self.children
    }

    /// Number of populated slots.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if no slot is populated.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Index into `children` of the child in `slot`.
    fn rank(&self, slot: usize) -> usize {
        self.mask[..slot].count_ones()
    }

    /// Returns the child in `slot`, if populated.
    pub fn child(&self, slot: usize) -> Option<&Child<T>> {
        if self.mask[slot] {
            Some(&self.children[self.rank(slot)])
        } else {
            None
        }
    }

    fn child_mut(&mut self, slot: usize) -> Option<&mut Child<T>> {
        if self.mask[slot] {
            let rank = self.rank(slot);
            Some(&mut self.children[rank])
        } else {
            None
        }
    }

    fn child_or_insert_with(&mut self, slot: usize, make: impl FnOnce() -> Child<T>) -> &mut Child<T> {
        let rank = self.rank(slot);
        if !self.mask[slot] {
            self.mask.set(slot, true);
            self.children.insert(rank, make());
        }
        &mut self.children[rank]
    }

    fn remove_child(&mut self, slot: usize) -> Option<Child<T>> {
        if !self.mask[slot] {
            return None;
        }
        let rank = self.rank(slot);
        self.mask.set(slot, false);
        Some(self.children.remove(rank))
    }
}

/// Structural counters gathered in one walk over the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Inner nodes, including the root.
    pub nodes: usize,
    /// Allocated leaf blocks.
    pub leaves: usize,
    /// Non-default cells.
    pub occupied: usize,
    /// Approximate heap footprint in bytes.
    pub memory_bytes: usize,
}

/// Hierarchical sparse map from cell coordinates to values.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialIndex<T: CellValue> {
    layout: GridLayout,
    root: InnerNode<T>,
}

impl<T: CellValue> SpatialIndex<T> {
    /// Creates an empty index with the given tree shape.
    pub fn new(layout: GridLayout) -> Self {
        SpatialIndex {
            layout,
            root: InnerNode::new(layout.inner_slots()),
        }
    }

    pub(crate) fn from_root(layout: GridLayout, root: InnerNode<T>) -> Self {
        SpatialIndex { layout, root }
    }

    /// The tree shape.
    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    /// The root node; present even when the index is empty.
    pub fn root(&self) -> &InnerNode<T> {
        &self.root
    }

    /// Returns the value at `coord`, or the default if the cell was never written.
    ///
    /// Coordinates outside the grid read as default. Never allocates.
    pub fn get(&self, coord: Coord) -> T {
        self.layout
            .to_biased(coord)
            .and_then(|biased| {
                self.find_leaf(biased)
                    .map(|leaf| leaf.get(self.layout.leaf_index(biased)))
            })
            .unwrap_or_default()
    }

    pub(crate) fn find_leaf(&self, biased: Biased) -> Option<&LeafBlock<T>> {
        let mut node = &self.root;
        let mut level = self.layout.depth();
        loop {
            match node.child(self.layout.slot_at(biased, level))? {
                Child::Node(inner) => {
                    node = &**inner;
                    level -= 1;
                }
                Child::Leaf(leaf) => return Some(leaf),
            }
        }
    }

    /// Returns the leaf block named by a level-0 region key.
    pub fn leaf_at(&self, key: RegionKey) -> Option<&LeafBlock<T>> {
        if key.level != 0 {
            return None;
        }
        let shift = self.layout.leaf_bits();
        let limit = 1u64 << (self.layout.coord_bits() - shift as u32);
        if key.index.iter().any(|&i| i >= limit) {
            return None;
        }
        self.find_leaf([
            key.index[0] << shift,
            key.index[1] << shift,
            key.index[2] << shift,
        ])
    }

    /// Stores `value` at `coord`, allocating missing nodes from root to leaf.
    ///
    /// Storing the default value erases the cell instead, so it never allocates.
    ///
    /// # Returns
    /// The previous non-default value, if any.
    ///
    /// # Errors
    /// Returns [`GridError::OutOfBounds`] if `coord` is outside the grid.
    pub fn set(&mut self, coord: Coord, value: T) -> Result<Option<T>, GridError> {
        let biased = self.layout.checked_biased(coord)?;
        if is_default(&value) {
            return Ok(self.erase_biased(biased));
        }

        let layout = self.layout;
        let mut node = &mut self.root;
        let mut level = layout.depth();
        loop {
            let slot = layout.slot_at(biased, level);
            let child = node.child_or_insert_with(slot, || {
                trace!("allocating child at level {} slot {}", level - 1, slot);
                if level == 1 {
                    Child::Leaf(Box::new(LeafBlock::new(layout.leaf_cells())))
                } else {
                    Child::Node(Box::new(InnerNode::new(layout.inner_slots())))
                }
            });
            match child {
                Child::Node(inner) => {
                    node = &mut **inner;
                    level -= 1;
                }
                Child::Leaf(leaf) => {
                    let previous = leaf.set(layout.leaf_index(biased), value);
                    return Ok((!is_default(&previous)).then_some(previous));
                }
            }
        }
    }

    /// Resets the cell at `coord` to default, pruning emptied blocks and nodes.
    ///
    /// Erasing a default or out-of-range cell is a no-op.
    ///
    /// # Returns
    /// The removed value, if the cell was occupied.
    pub fn erase(&mut self, coord: Coord) -> Option<T> {
        let biased = self.layout.to_biased(coord)?;
        self.erase_biased(biased)
    }

    fn erase_biased(&mut self, biased: Biased) -> Option<T> {
        let layout = self.layout;
        erase_in(&mut self.root, &layout, biased, layout.depth())
    }

    /// Removes every cell, releasing the whole tree.
    pub fn clear(&mut self) {
        debug!("clearing index with {} root children", self.root.child_count());
        self.root = InnerNode::new(self.layout.inner_slots());
    }

    /// Returns `true` if no cell is occupied.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Lazily iterates `(coordinate, value)` for every occupied cell.
    ///
    /// Cells come out grouped by leaf block, in slot order. Each call starts a
    /// fresh traversal.
    pub fn iter(&self) -> OccupiedIter<'_, T> {
        OccupiedIter::new(self)
    }

    /// Calls `callback` for every occupied cell.
    pub fn for_each_occupied(&self, mut callback: impl FnMut(Coord, T)) {
        for (coord, value) in self.iter() {
            callback(coord, value);
        }
    }

    /// Counts nodes, leaves, occupied cells and memory in one walk.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        collect_stats(&self.root, &mut stats);
        stats.memory_bytes += std::mem::size_of::<Self>() - std::mem::size_of::<InnerNode<T>>();
        stats
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.stats().occupied
    }

    /// Number of allocated leaf blocks.
    pub fn leaf_count(&self) -> usize {
        self.stats().leaves
    }

    /// Number of inner nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.stats().nodes
    }

    /// Approximate heap footprint of the tree in bytes.
    pub fn memory_usage(&self) -> usize {
        self.stats().memory_bytes
    }

    /// Smallest box containing every occupied cell.
    pub fn bounds(&self) -> Option<GridBounds> {
        let mut iter = self.iter();
        let (first, _) = iter.next()?;
        let mut bounds = GridBounds::from_point(first);
        for (coord, _) in iter {
            bounds.expand_to_include(coord);
        }
        Some(bounds)
    }
}

fn erase_in<T: CellValue>(node: &mut InnerNode<T>, layout: &GridLayout, biased: Biased, level: u8) -> Option<T> {
    let slot = layout.slot_at(biased, level);
    let (previous, now_empty) = match node.child_mut(slot)? {
        Child::Node(inner) => {
            let previous = erase_in(inner, layout, biased, level - 1)?;
            (previous, inner.is_empty())
        }
        Child::Leaf(leaf) => {
            let index = layout.leaf_index(biased);
            let previous = leaf.get(index);
            if is_default(&previous) {
                return None;
            }
            leaf.set(index, T::default());
            (previous, leaf.is_empty())
        }
    };
    if now_empty {
        trace!("pruning empty child at level {} slot {}", level - 1, slot);
        node.remove_child(slot);
    }
    Some(previous)
}

fn collect_stats<T: CellValue>(node: &InnerNode<T>, stats: &mut TreeStats) {
    stats.nodes += 1;
    stats.memory_bytes += std::mem::size_of::<InnerNode<T>>()
        + node.mask.capacity().div_ceil(8)
        + node.children.capacity() * std::mem::size_of::<Child<T>>();
    for child in &node.children {
        match child {
            Child::Node(inner) => collect_stats(inner, stats),
            Child::Leaf(leaf) => {
                stats.leaves += 1;
                stats.occupied += leaf.occupied_count();
                stats.memory_bytes += leaf.memory_usage();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point3;

    fn index() -> SpatialIndex<u32> {
        SpatialIndex::new(GridLayout::new(3, 2, 3).unwrap())
    }

    #[test]
    fn test_get_on_empty_index_does_not_allocate() {
        let idx = index();
        assert_eq!(idx.get(Point3::new(1, 2, 3)), 0);
        assert_eq!(idx.node_count(), 1);
        assert_eq!(idx.leaf_count(), 0);
    }

    #[test]
    fn test_set_allocates_path_to_leaf() {
        let mut idx = index();
        assert_eq!(idx.set(Point3::new(1, 2, 3), 5).unwrap(), None);
        assert_eq!(idx.get(Point3::new(1, 2, 3)), 5);
        // root + two levels of inner nodes below it
        assert_eq!(idx.node_count(), 3);
        assert_eq!(idx.leaf_count(), 1);
        assert_eq!(idx.set(Point3::new(1, 2, 3), 6).unwrap(), Some(5));
    }

    #[test]
    fn test_neighbours_share_leaf() {
        let mut idx = index();
        idx.set(Point3::new(0, 0, 0), 1).unwrap();
        idx.set(Point3::new(7, 7, 7), 2).unwrap();
        assert_eq!(idx.leaf_count(), 1);
        idx.set(Point3::new(8, 0, 0), 3).unwrap();
        assert_eq!(idx.leaf_count(), 2);
        assert_eq!(idx.occupied_count(), 3);
    }

    #[test]
    fn test_negative_coordinates() {
        let mut idx = index();
        idx.set(Point3::new(-1, -1, -1), 9).unwrap();
        idx.set(Point3::new(-256, 255, 0), 4).unwrap();
        assert_eq!(idx.get(Point3::new(-1, -1, -1)), 9);
        assert_eq!(idx.get(Point3::new(-256, 255, 0)), 4);
        assert_eq!(idx.get(Point3::new(0, 0, 0)), 0);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut idx = index();
        let err = idx.set(Point3::new(256, 0, 0), 1).unwrap_err();
        assert!(matches!(err, GridError::OutOfBounds { half_extent: 256, .. }));
        assert_eq!(idx.get(Point3::new(256, 0, 0)), 0);
        assert_eq!(idx.erase(Point3::new(0, -257, 0)), None);
    }

    #[test]
    fn test_erase_prunes_back_to_root() {
        let mut idx = index();
        idx.set(Point3::new(100, -50, 3), 7).unwrap();
        assert_eq!(idx.erase(Point3::new(100, -50, 3)), Some(7));
        assert!(idx.is_empty());
        assert_eq!(idx.node_count(), 1);
        assert_eq!(idx.leaf_count(), 0);
        assert_eq!(idx, index());
    }

    #[test]
    fn test_erase_keeps_shared_path() {
        let mut idx = index();
        idx.set(Point3::new(0, 0, 0), 1).unwrap();
        idx.set(Point3::new(1, 0, 0), 2).unwrap();
        idx.set(Point3::new(100, 0, 0), 3).unwrap();
        let before = idx.node_count();
        idx.erase(Point3::new(0, 0, 0));
        assert_eq!(idx.leaf_count(), 2);
        assert_eq!(idx.node_count(), before);
        idx.erase(Point3::new(100, 0, 0));
        assert_eq!(idx.leaf_count(), 1);
        assert!(idx.node_count() < before);
    }

    #[test]
    fn test_erase_of_default_cell_is_noop() {
        let mut idx = index();
        assert_eq!(idx.erase(Point3::new(3, 3, 3)), None);
        assert_eq!(idx.node_count(), 1);
        idx.set(Point3::new(0, 0, 0), 1).unwrap();
        let shape = idx.clone();
        assert_eq!(idx.erase(Point3::new(1, 0, 0)), None);
        assert_eq!(idx, shape);
    }

    #[test]
    fn test_setting_default_erases() {
        let mut idx = index();
        assert_eq!(idx.set(Point3::new(5, 5, 5), 0).unwrap(), None);
        assert_eq!(idx.node_count(), 1);
        idx.set(Point3::new(5, 5, 5), 2).unwrap();
        assert_eq!(idx.set(Point3::new(5, 5, 5), 0).unwrap(), Some(2));
        assert!(idx.is_empty());
        assert_eq!(idx.node_count(), 1);
    }

    #[test]
    fn test_child_mask_and_rank() {
        let mut node: InnerNode<u8> = InnerNode::new(8);
        node.child_or_insert_with(5, || Child::Leaf(Box::new(LeafBlock::filled(1, 5))));
        node.child_or_insert_with(1, || Child::Leaf(Box::new(LeafBlock::filled(1, 1))));
        node.child_or_insert_with(3, || Child::Leaf(Box::new(LeafBlock::filled(1, 3))));
        assert_eq!(node.mask().iter_ones().collect::<Vec<_>>(), vec![1, 3, 5]);
        match node.child(3) {
            Some(Child::Leaf(leaf)) => assert_eq!(leaf.get(0), 3),
            other => panic!("unexpected child {other:?}"),
        }
        assert!(node.child(4).is_none());
        assert!(node.remove_child(3).is_some());
        assert!(node.remove_child(3).is_none());
        assert_eq!(node.child_count(), 2);
    }

    #[test]
    fn test_bounds_and_clear() {
        let mut idx = index();
        assert!(idx.bounds().is_none());
        idx.set(Point3::new(-3, 4, 10), 1).unwrap();
        idx.set(Point3::new(20, -8, 0), 1).unwrap();
        let bounds = idx.bounds().unwrap();
        assert_eq!(bounds.min, Point3::new(-3, -8, 0));
        assert_eq!(bounds.max, Point3::new(20, 4, 10));
        idx.clear();
        assert!(idx.is_empty());
        assert_eq!(idx.node_count(), 1);
    }

    #[test]
    fn test_leaf_at_region_key() {
        let mut idx = index();
        idx.set(Point3::new(9, 0, 0), 4).unwrap();
        let key = idx.layout().region_key(Point3::new(9, 0, 0), 0).unwrap();
        let leaf = idx.leaf_at(key).unwrap();
        assert_eq!(leaf.occupied_count(), 1);
        let other = idx.layout().region_key(Point3::new(0, 0, 0), 0).unwrap();
        assert!(idx.leaf_at(other).is_none());
    }

    #[test]
    fn test_memory_usage_grows_with_leaves() {
        let mut idx = index();
        let empty = idx.memory_usage();
        idx.set(Point3::new(0, 0, 0), 1).unwrap();
        let one = idx.memory_usage();
        assert!(one > empty + 512 * std::mem::size_of::<u32>());
    }
}
