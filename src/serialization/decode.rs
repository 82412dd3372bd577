//! Reconstruction of the tree body, validating structure as it goes.

use std::marker::PhantomData;

use bitvec::prelude::*;
use num_traits::FromPrimitive;

use super::reader::ByteReader;
use super::LeafEncoding;
use crate::error::FormatError;
use crate::voxels::cell::{is_default, CellValue};
use crate::voxels::coord::GridLayout;
use crate::voxels::index::{Child, InnerNode};
use crate::voxels::leaf::LeafBlock;

pub(crate) struct Decoder<'r, 'a, T: CellValue> {
    reader: &'r mut ByteReader<'a>,
    layout: GridLayout,
    leaves: u64,
    _cell: PhantomData<T>,
}

impl<'r, 'a, T: CellValue> Decoder<'r, 'a, T> {
    pub(crate) fn new(reader: &'r mut ByteReader<'a>, layout: GridLayout) -> Self {
        Decoder {
            reader,
            layout,
            leaves: 0,
            _cell: PhantomData,
        }
    }

    /// Leaves decoded so far.
    pub(crate) fn leaves(&self) -> u64 {
        self.leaves
    }

    /// Decodes the node at `level` and its subtree.
    ///
    /// Exactly one child record is read per set mask bit, so a stream cut short
    /// of the declared children fails with [`FormatError::Truncated`].
    pub(crate) fn decode_node(&mut self, level: u8) -> Result<InnerNode<T>, FormatError> {
        let offset = self.reader.offset();
        let mask = self.decode_mask()?;
        if mask.not_any() {
            return Err(FormatError::EmptyNode { offset });
        }

        let count = mask.count_ones();
        let mut children = Vec::with_capacity(count);
        for _ in 0..count {
            let child = if level == 1 {
                Child::Leaf(Box::new(self.decode_leaf()?))
            } else {
                Child::Node(Box::new(self.decode_node(level - 1)?))
            };
            children.push(child);
        }
        Ok(InnerNode::from_parts(mask, children))
    }

    fn decode_mask(&mut self) -> Result<BitVec, FormatError> {
        let slots = self.layout.inner_slots();
        let bytes = self.reader.take(slots.div_ceil(8))?;
        let mut mask = bitvec![0; slots];
        for slot in 0..slots {
            if (bytes[slot / 8] >> (slot % 8)) & 1 == 1 {
                mask.set(slot, true);
            }
        }
        Ok(mask)
    }

    fn decode_leaf(&mut self) -> Result<LeafBlock<T>, FormatError> {
        let offset = self.reader.offset();
        let tag = self.reader.read_u8()?;
        let encoding = LeafEncoding::from_u8(tag).ok_or(FormatError::UnknownLeafEncoding(tag))?;
        let cell_count = self.layout.leaf_cells();

        let leaf = match encoding {
            LeafEncoding::Dense => {
                let cell_size = std::mem::size_of::<T>();
                let bytes = self.reader.take(cell_count * cell_size)?;
                let cells = (0..cell_count)
                    .map(|i| bytemuck::pod_read_unaligned(&bytes[i * cell_size..(i + 1) * cell_size]))
                    .collect();
                LeafBlock::from_cells(cells)
            }
            LeafEncoding::Uniform => {
                let value: T = self.reader.read_cell()?;
                if is_default(&value) {
                    return Err(FormatError::EmptyLeaf { offset });
                }
                LeafBlock::filled(cell_count, value)
            }
            LeafEncoding::RunLength => {
                let runs = self.reader.read_u32()?;
                let mut cells = Vec::with_capacity(cell_count);
                for _ in 0..runs {
                    let length = self.reader.read_u32()? as usize;
                    let value: T = self.reader.read_cell()?;
                    if cells.len() + length > cell_count {
                        return Err(FormatError::RunLengthMismatch {
                            covered: (cells.len() + length) as u64,
                            expected: cell_count,
                        });
                    }
                    cells.extend(std::iter::repeat(value).take(length));
                }
                if cells.len() != cell_count {
                    return Err(FormatError::RunLengthMismatch {
                        covered: cells.len() as u64,
                        expected: cell_count,
                    });
                }
                LeafBlock::from_cells(cells)
            }
        };

        if leaf.is_empty() {
            return Err(FormatError::EmptyLeaf { offset });
        }
        self.leaves += 1;
        Ok(leaf)
    }
}
