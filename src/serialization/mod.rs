//! # Serialization
//!
//! Converts a `VoxelGrid` to and from a compact, self-describing byte stream
//! that preserves sparsity.
//!
//! ## Layout
//!
//! A stream is a fixed [`GridHeader`] followed, unless the grid is empty, by a
//! pre-order walk of the tree:
//!
//! * an inner node is its occupancy mask (`slots / 8` bytes, LSB-first)
//!   followed by each populated child in slot order
//! * a leaf is a one-byte [`LeafEncoding`] tag and its payload: every cell
//!   (dense), a single cell (uniform), or a `u32` run count followed by
//!   `(u32 length, cell)` pairs (run-length)
//!
//! An empty grid serializes to the header alone. Cell payloads are the raw
//! `Pod` bytes of the host that wrote them; the header records that byte order
//! and readers on a different host reject the stream.
//!
//! ```
//! use cgmath::Point3;
//! use sparse_voxel_grid::{serialization, VoxelGrid};
//!
//! let mut grid: VoxelGrid<u16> = VoxelGrid::new(0.1);
//! grid.set(Point3::new(-4, 2, 9), 300).unwrap();
//!
//! let bytes = serialization::serialize(&grid);
//! let restored: VoxelGrid<u16> = serialization::deserialize(&bytes).unwrap();
//! assert_eq!(restored, grid);
//! ```

use std::io::{Read, Write};

use log::debug;
use num_derive::FromPrimitive;

use crate::error::FormatError;
use crate::voxels::cell::CellValue;
use crate::voxels::grid::VoxelGrid;
use crate::voxels::index::SpatialIndex;

mod decode;
mod encode;
pub mod header;
mod reader;

pub use header::{ByteOrder, GridHeader, FORMAT_VERSION, HEADER_LEN, MAGIC};

use decode::Decoder;
use reader::ByteReader;

/// How a leaf block's cells are stored.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
pub enum LeafEncoding {
    /// Every cell, in x-major order.
    Dense = 0,
    /// One cell value shared by the whole block.
    Uniform = 1,
    /// Runs of equal consecutive cells.
    RunLength = 2,
}

/// Serializes `grid` into a new byte vector.
pub fn serialize<T: CellValue>(grid: &VoxelGrid<T>) -> Vec<u8> {
    let layout = grid.layout();
    let leaf_count = grid.leaf_count() as u64;
    let header = GridHeader {
        version: FORMAT_VERSION,
        byte_order: ByteOrder::host(),
        depth: layout.depth(),
        inner_bits: layout.inner_bits(),
        leaf_bits: layout.leaf_bits(),
        cell_size: std::mem::size_of::<T>() as u16,
        resolution: grid.resolution(),
        leaf_count,
    };

    let mut out = Vec::with_capacity(HEADER_LEN);
    header.write(&mut out);
    if leaf_count > 0 {
        encode::encode_node(grid.index().root(), &mut out);
    }
    debug!("serialized grid: {} leaves, {} bytes", leaf_count, out.len());
    out
}

/// Serializes `grid` into `writer`.
///
/// # Errors
/// Returns [`FormatError::Io`] if writing fails.
pub fn serialize_into<T: CellValue, W: Write>(grid: &VoxelGrid<T>, mut writer: W) -> Result<(), FormatError> {
    writer.write_all(&serialize(grid))?;
    writer.flush()?;
    Ok(())
}

/// Reads and checks only the header of a stream.
///
/// # Errors
/// Returns a [`FormatError`] for a short stream, bad magic or unsupported version.
pub fn read_header(bytes: &[u8]) -> Result<GridHeader, FormatError> {
    GridHeader::read(&mut ByteReader::new(bytes))
}

/// Reconstructs a grid from `bytes`.
///
/// # Errors
/// Returns a [`FormatError`] if the header is unsupported or inconsistent with
/// `T`, if the stream is truncated relative to the bitmask-declared children,
/// or if the tree is malformed.
pub fn deserialize<T: CellValue>(bytes: &[u8]) -> Result<VoxelGrid<T>, FormatError> {
    let mut reader = ByteReader::new(bytes);
    let header = GridHeader::read(&mut reader)?;
    if header.byte_order != ByteOrder::host() {
        return Err(FormatError::ByteOrderMismatch);
    }
    let expected = std::mem::size_of::<T>() as u16;
    if header.cell_size != expected {
        return Err(FormatError::CellSizeMismatch {
            found: header.cell_size,
            expected,
        });
    }
    let config = header.config();
    let layout = config.validate().map_err(FormatError::InvalidHeader)?;

    let index = if header.leaf_count == 0 {
        SpatialIndex::new(layout)
    } else {
        let mut decoder = Decoder::new(&mut reader, layout);
        let root = decoder.decode_node(layout.depth())?;
        if decoder.leaves() != header.leaf_count {
            return Err(FormatError::LeafCountMismatch {
                declared: header.leaf_count,
                found: decoder.leaves(),
            });
        }
        SpatialIndex::from_root(layout, root)
    };

    if reader.remaining() > 0 {
        return Err(FormatError::TrailingBytes(reader.remaining()));
    }
    debug!("deserialized grid: {} leaves from {} bytes", header.leaf_count, bytes.len());
    Ok(VoxelGrid::from_parts(config.resolution, index))
}

/// Reads a whole stream from `reader` and reconstructs the grid.
///
/// # Errors
/// Returns [`FormatError::Io`] if reading fails, otherwise as [`deserialize`].
pub fn deserialize_from<T: CellValue, R: Read>(mut reader: R) -> Result<VoxelGrid<T>, FormatError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    deserialize(&bytes)
}
