//! # Error Module
//!
//! Error types for grid construction, cell mutation and binary (de)serialization.

use crate::voxels::coord::Coord;

/// Errors raised while configuring or mutating a grid.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GridError {
    /// The cell size must be positive and finite.
    #[error("resolution must be positive and finite, got {0}")]
    InvalidResolution(f64),

    /// The tree shape cannot be represented.
    #[error("invalid grid layout: {reason}")]
    InvalidLayout {
        /// Which constraint was violated.
        reason: String,
    },

    /// A coordinate lies outside the extent addressable by the configured depth.
    #[error("coordinate {coord:?} is outside the grid extent [-{half_extent}, {half_extent})")]
    OutOfBounds {
        /// The rejected coordinate.
        coord: Coord,
        /// Half the edge length of the addressable cube, in cells.
        half_extent: i64,
    },

    /// A world position is not finite or maps beyond the `i32` coordinate range.
    #[error("world position {position:?} does not map to a cell")]
    InvalidPosition {
        /// The rejected position, as `[x, y, z]`.
        position: [f64; 3],
    },

    /// Occupancy sensor options are inconsistent.
    #[error("invalid occupancy options: {reason}")]
    InvalidOptions {
        /// Which constraint was violated.
        reason: String,
    },

    /// A thread panicked while holding the shared grid lock.
    #[error("shared grid lock was poisoned")]
    Poisoned,

    /// The JSON configuration could not be parsed.
    #[error("failed to parse grid config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Errors raised while decoding a serialized grid.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FormatError {
    /// The stream does not start with the grid magic bytes.
    #[error("bad magic bytes {found:?}")]
    BadMagic {
        /// The first four bytes of the stream.
        found: [u8; 4],
    },

    /// The header version is not one this build can read.
    #[error("unsupported format version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version read from the header.
        found: u16,
        /// Version this build writes and reads.
        supported: u16,
    },

    /// The stream was written on a host with a different byte order.
    #[error("stream byte order does not match this host")]
    ByteOrderMismatch,

    /// The stream stores cells of a different width than the requested value type.
    #[error("cell size mismatch: stream has {found} bytes per cell, expected {expected}")]
    CellSizeMismatch {
        /// Cell width recorded in the header.
        found: u16,
        /// `size_of` the requested value type.
        expected: u16,
    },

    /// The header describes a grid shape that fails validation.
    #[error("invalid header: {0}")]
    InvalidHeader(#[source] GridError),

    /// The stream ended before the data the header or a bitmask promised.
    #[error("stream truncated at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Offset where the read started.
        offset: usize,
        /// Bytes the read required.
        needed: usize,
        /// Bytes left in the stream.
        remaining: usize,
    },

    /// A leaf record carries an encoding tag this build does not know.
    #[error("unknown leaf encoding tag {0}")]
    UnknownLeafEncoding(u8),

    /// An inner node with an all-empty mask was found; pruned trees never contain one.
    #[error("empty node at offset {offset}")]
    EmptyNode {
        /// Offset of the node's mask.
        offset: usize,
    },

    /// A leaf whose cells are all default was found.
    #[error("empty leaf at offset {offset}")]
    EmptyLeaf {
        /// Offset of the leaf record.
        offset: usize,
    },

    /// Run-length records do not cover the block exactly.
    #[error("run lengths cover {covered} cells, block holds {expected}")]
    RunLengthMismatch {
        /// Sum of the decoded run lengths.
        covered: u64,
        /// Cells per leaf block.
        expected: usize,
    },

    /// The number of decoded leaves differs from the header.
    #[error("header declares {declared} leaves, stream holds {found}")]
    LeafCountMismatch {
        /// Leaf count from the header.
        declared: u64,
        /// Leaves actually decoded.
        found: u64,
    },

    /// Bytes remain after the tree was fully decoded.
    #[error("{0} trailing bytes after grid data")]
    TrailingBytes(usize),

    /// Reading or writing the underlying stream failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
