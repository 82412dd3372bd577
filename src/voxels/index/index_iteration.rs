//! # Index Iteration Module
//!
//! A lazy, restartable iterator over every occupied cell of a `SpatialIndex`.
//!
//! The traversal keeps an explicit stack of inner nodes instead of recursing,
//! so it can be suspended between any two cells. Each frame pairs the node's
//! set mask bits with its compressed children: because children are stored in
//! slot order, the n-th set bit always belongs to the n-th child.

use std::slice;

use bitvec::prelude::*;
use bitvec::slice::IterOnes;

use crate::voxels::cell::CellValue;
use crate::voxels::coord::{Biased, Coord, GridLayout};
use crate::voxels::leaf::leaf_iteration::LeafCellIterator;

use super::{Child, InnerNode, SpatialIndex};

/// One inner node on the traversal stack.
struct Frame<'a, T: CellValue> {
    /// Level of the node
    level: u8,
    /// Biased minimum corner of the node's region
    origin: Biased,
    /// Remaining populated slots
    slots: IterOnes<'a, usize, Lsb0>,
    /// Remaining children, aligned with `slots`
    children: slice::Iter<'a, Child<T>>,
}

impl<'a, T: CellValue> Frame<'a, T> {
    fn new(node: &'a InnerNode<T>, level: u8, origin: Biased) -> Self {
        Frame {
            level,
            origin,
            slots: node.mask().iter_ones(),
            children: node.children().iter(),
        }
    }
}

/// An iterator over `(coordinate, value)` for every occupied cell.
///
/// Created by [`SpatialIndex::iter`]; finite, and a new call starts over.
pub struct OccupiedIter<'a, T: CellValue> {
    layout: GridLayout,
    stack: Vec<Frame<'a, T>>,
    leaf: Option<(LeafCellIterator<'a, T>, Biased)>,
}

impl<'a, T: CellValue> OccupiedIter<'a, T> {
    pub(crate) fn new(index: &'a SpatialIndex<T>) -> Self {
        let layout = index.layout();
        let mut stack = Vec::with_capacity(layout.depth() as usize);
        stack.push(Frame::new(index.root(), layout.depth(), [0, 0, 0]));
        OccupiedIter {
            layout,
            stack,
            leaf: None,
        }
    }
}

impl<T: CellValue> Iterator for OccupiedIter<'_, T> {
    type Item = (Coord, T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((cells, origin)) = &mut self.leaf {
                if let Some((local, value)) = cells.next() {
                    let biased = [
                        origin[0] + local.x as u64,
                        origin[1] + local.y as u64,
                        origin[2] + local.z as u64,
                    ];
                    return Some((self.layout.from_biased(biased), value));
                }
                self.leaf = None;
            }

            let frame = self.stack.last_mut()?;
            match (frame.slots.next(), frame.children.next()) {
                (Some(slot), Some(child)) => {
                    let level = frame.level;
                    let origin = self.layout.child_origin(frame.origin, level, slot);
                    match child {
                        Child::Node(inner) => self.stack.push(Frame::new(inner, level - 1, origin)),
                        Child::Leaf(leaf) => {
                            self.leaf = Some((leaf.iter_occupied(self.layout.leaf_bits()), origin));
                        }
                    }
                }
                _ => {
                    self.stack.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use cgmath::Point3;

    use crate::voxels::coord::GridLayout;
    use crate::voxels::index::SpatialIndex;

    #[test]
    fn test_empty_index_yields_nothing() {
        let idx: SpatialIndex<u8> = SpatialIndex::new(GridLayout::new(2, 2, 2).unwrap());
        assert_eq!(idx.iter().count(), 0);
    }

    #[test]
    fn test_iteration_visits_every_cell_once() {
        let mut idx: SpatialIndex<i16> = SpatialIndex::new(GridLayout::new(3, 2, 2).unwrap());
        let mut expected = HashMap::new();
        for (i, c) in [(-64, -64, -64), (63, 63, 63), (0, 0, 0), (1, 0, 0), (-5, 17, 40), (33, -2, 9)]
            .into_iter()
            .enumerate()
        {
            let coord = Point3::new(c.0, c.1, c.2);
            idx.set(coord, i as i16 + 1).unwrap();
            expected.insert(coord, i as i16 + 1);
        }

        let seen: HashMap<_, _> = idx.iter().collect();
        assert_eq!(seen, expected);
        assert_eq!(idx.iter().count(), idx.occupied_count());
    }

    #[test]
    fn test_iteration_is_restartable() {
        let mut idx: SpatialIndex<u8> = SpatialIndex::new(GridLayout::new(2, 1, 2).unwrap());
        idx.set(Point3::new(1, 1, 1), 3).unwrap();
        idx.set(Point3::new(-7, 2, 0), 4).unwrap();
        let first: Vec<_> = idx.iter().collect();
        let second: Vec<_> = idx.iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_for_each_occupied() {
        let mut idx: SpatialIndex<u32> = SpatialIndex::new(GridLayout::new(2, 2, 3).unwrap());
        idx.set(Point3::new(4, 4, 4), 10).unwrap();
        idx.set(Point3::new(-4, 4, 4), 20).unwrap();
        let mut total = 0;
        idx.for_each_occupied(|_, v| total += v);
        assert_eq!(total, 30);
    }
}
