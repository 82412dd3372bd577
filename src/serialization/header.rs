//! # Header Module
//!
//! The fixed-size header at the start of every serialized grid. All integers
//! are little-endian.
//!
//! | field          | bytes |
//! |----------------|-------|
//! | magic `SVXG`   | 4     |
//! | version        | 2     |
//! | byte order tag | 1     |
//! | depth          | 1     |
//! | inner bits     | 1     |
//! | leaf bits      | 1     |
//! | cell size      | 2     |
//! | resolution     | 8     |
//! | leaf count     | 8     |

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::reader::ByteReader;
use crate::config::GridConfig;
use crate::error::FormatError;

/// Magic bytes opening every stream.
pub const MAGIC: [u8; 4] = *b"SVXG";
/// Format version written by this build, and the only one it reads.
pub const FORMAT_VERSION: u16 = 1;
/// Encoded size of [`GridHeader`] in bytes.
pub const HEADER_LEN: usize = 28;

/// Byte order of the cell payloads in a stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
pub enum ByteOrder {
    /// Little-endian cell payloads.
    Little = 0,
    /// Big-endian cell payloads.
    Big = 1,
}

impl ByteOrder {
    /// Byte order of the running host.
    pub fn host() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }
}

/// Decoded header of a serialized grid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridHeader {
    /// Format version.
    pub version: u16,
    /// Byte order of the cell payloads.
    pub byte_order: ByteOrder,
    /// Inner tree levels.
    pub depth: u8,
    /// Per-axis bit width of an inner node.
    pub inner_bits: u8,
    /// Per-axis bit width of a leaf block.
    pub leaf_bits: u8,
    /// `size_of` the stored cell type.
    pub cell_size: u16,
    /// Cell edge length in world units.
    pub resolution: f64,
    /// Number of leaf blocks in the body; zero for a header-only stream.
    pub leaf_count: u64,
}

impl GridHeader {
    /// The grid configuration recorded in the header.
    pub fn config(&self) -> GridConfig {
        GridConfig {
            resolution: self.resolution,
            depth: self.depth,
            inner_bits: self.inner_bits,
            leaf_bits: self.leaf_bits,
        }
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.push(self.byte_order as u8);
        out.push(self.depth);
        out.push(self.inner_bits);
        out.push(self.leaf_bits);
        out.extend_from_slice(&self.cell_size.to_le_bytes());
        out.extend_from_slice(&self.resolution.to_le_bytes());
        out.extend_from_slice(&self.leaf_count.to_le_bytes());
    }

    /// Reads a header, checking the magic bytes and version only.
    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self, FormatError> {
        let magic = reader.read_magic()?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic { found: magic });
        }
        let version = reader.read_u16()?;
        if version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: version,
                supported: FORMAT_VERSION,
            });
        }
        let byte_order = ByteOrder::from_u8(reader.read_u8()?).ok_or(FormatError::ByteOrderMismatch)?;
        Ok(GridHeader {
            version,
            byte_order,
            depth: reader.read_u8()?,
            inner_bits: reader.read_u8()?,
            leaf_bits: reader.read_u8()?,
            cell_size: reader.read_u16()?,
            resolution: reader.read_f64()?,
            leaf_count: reader.read_u64()?,
        })
    }
}
