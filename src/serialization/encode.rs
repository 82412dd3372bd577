//! Pre-order encoding of the tree body.

use bitvec::prelude::*;
use log::trace;

use super::LeafEncoding;
use crate::voxels::cell::CellValue;
use crate::voxels::index::{Child, InnerNode};
use crate::voxels::leaf::LeafBlock;

/// Appends `node` and its subtree: mask first, then each child in slot order.
pub(crate) fn encode_node<T: CellValue>(node: &InnerNode<T>, out: &mut Vec<u8>) {
    encode_mask(node.mask(), out);
    for child in node.children() {
        match child {
            Child::Node(inner) => encode_node(inner, out),
            Child::Leaf(leaf) => encode_leaf(leaf, out),
        }
    }
}

/// Packs the mask LSB-first, eight slots per byte.
fn encode_mask(mask: &BitSlice, out: &mut Vec<u8>) {
    let start = out.len();
    out.resize(start + mask.len().div_ceil(8), 0);
    for slot in mask.iter_ones() {
        out[start + slot / 8] |= 1 << (slot % 8);
    }
}

/// Appends a leaf in whichever encoding is smallest.
pub(crate) fn encode_leaf<T: CellValue>(leaf: &LeafBlock<T>, out: &mut Vec<u8>) {
    if let Some(value) = leaf.uniform_value() {
        out.push(LeafEncoding::Uniform as u8);
        out.extend_from_slice(bytemuck::bytes_of(&value));
        return;
    }

    let runs = collect_runs(leaf.cells());
    let cell_size = std::mem::size_of::<T>();
    let run_length_size = 4 + runs.len() * (4 + cell_size);
    let dense_size = leaf.cell_count() * cell_size;

    if run_length_size < dense_size {
        trace!("leaf: {} runs, {} bytes instead of {}", runs.len(), run_length_size, dense_size);
        out.push(LeafEncoding::RunLength as u8);
        out.extend_from_slice(&(runs.len() as u32).to_le_bytes());
        for (length, value) in runs {
            out.extend_from_slice(&length.to_le_bytes());
            out.extend_from_slice(bytemuck::bytes_of(&value));
        }
    } else {
        out.push(LeafEncoding::Dense as u8);
        out.extend_from_slice(bytemuck::cast_slice(leaf.cells()));
    }
}

fn collect_runs<T: CellValue>(cells: &[T]) -> Vec<(u32, T)> {
    let mut runs: Vec<(u32, T)> = Vec::new();
    for &cell in cells {
        match runs.last_mut() {
            Some((length, value)) if *value == cell => *length += 1,
            _ => runs.push((1, cell)),
        }
    }
    runs
}
