//! # Coordinate Module
//!
//! Cell coordinates, region keys and the `GridLayout` that maps between them.
//!
//! ## Biased Coordinates
//!
//! Cell coordinates are signed, but the tree indexes children with unsigned bit
//! fields. Every coordinate is therefore shifted by half the grid extent before
//! descending, so the addressable cube `[-2^(B-1), 2^(B-1))` maps onto
//! `[0, 2^B)` where `B = leaf_bits + inner_bits * depth`.
//!
//! ## Slot Layout
//!
//! Both inner slots and leaf cells are laid out x-major: `x | y << bits | z << 2 * bits`.

use cgmath::Point3;

use crate::config::{DEFAULT_DEPTH, DEFAULT_INNER_BITS, DEFAULT_LEAF_BITS};
use crate::error::GridError;

/// A cell coordinate at the finest resolution.
pub type Coord = Point3<i32>;

/// A coordinate shifted into the unsigned range used inside the tree.
pub(crate) type Biased = [u64; 3];

/// Largest number of inner levels a grid may have.
pub const MAX_DEPTH: u8 = 8;
/// Largest per-axis bit width of an inner node.
pub const MAX_INNER_BITS: u8 = 4;
/// Largest per-axis bit width of a leaf block.
pub const MAX_LEAF_BITS: u8 = 5;
/// Largest total number of coordinate bits per axis.
pub const MAX_COORD_BITS: u32 = 32;

/// The shape of a grid's tree.
///
/// A layout is only constructed through [`GridLayout::new`], so every instance
/// describes a tree whose coordinates fit in an `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridLayout {
    depth: u8,
    inner_bits: u8,
    leaf_bits: u8,
}

impl GridLayout {
    /// Validates and builds a layout.
    ///
    /// # Arguments
    /// * `depth` - Number of inner node levels above the leaf blocks (1..=8)
    /// * `inner_bits` - Per-axis bits resolved by each inner node (1..=4)
    /// * `leaf_bits` - Per-axis bits resolved by a leaf block (1..=5)
    ///
    /// # Errors
    /// Returns [`GridError::InvalidLayout`] when a width is out of range or the
    /// total coordinate width exceeds 32 bits.
    pub fn new(depth: u8, inner_bits: u8, leaf_bits: u8) -> Result<Self, GridError> {
        if !(1..=MAX_DEPTH).contains(&depth) {
            return Err(GridError::InvalidLayout {
                reason: format!("depth {depth} not in 1..={MAX_DEPTH}"),
            });
        }
        if !(1..=MAX_INNER_BITS).contains(&inner_bits) {
            return Err(GridError::InvalidLayout {
                reason: format!("inner_bits {inner_bits} not in 1..={MAX_INNER_BITS}"),
            });
        }
        if !(1..=MAX_LEAF_BITS).contains(&leaf_bits) {
            return Err(GridError::InvalidLayout {
                reason: format!("leaf_bits {leaf_bits} not in 1..={MAX_LEAF_BITS}"),
            });
        }
        let total = leaf_bits as u32 + inner_bits as u32 * depth as u32;
        if total > MAX_COORD_BITS {
            return Err(GridError::InvalidLayout {
                reason: format!("{total} coordinate bits exceed {MAX_COORD_BITS}"),
            });
        }
        Ok(GridLayout {
            depth,
            inner_bits,
            leaf_bits,
        })
    }

    /// Number of inner node levels; the root sits at this level, leaves at level 0.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Per-axis bit width of an inner node.
    pub fn inner_bits(&self) -> u8 {
        self.inner_bits
    }

    /// Per-axis bit width of a leaf block.
    pub fn leaf_bits(&self) -> u8 {
        self.leaf_bits
    }

    /// Children per axis of an inner node.
    pub fn inner_dim(&self) -> usize {
        1 << self.inner_bits
    }

    /// Child slots of an inner node (the branching factor).
    pub fn inner_slots(&self) -> usize {
        1 << (3 * self.inner_bits as usize)
    }

    /// Cells per axis of a leaf block.
    pub fn leaf_dim(&self) -> usize {
        1 << self.leaf_bits
    }

    /// Cells in a leaf block.
    pub fn leaf_cells(&self) -> usize {
        1 << (3 * self.leaf_bits as usize)
    }

    /// Coordinate bits per axis.
    pub fn coord_bits(&self) -> u32 {
        self.region_bits(self.depth)
    }

    /// Half the edge length of the addressable cube, in cells.
    pub fn half_extent(&self) -> i64 {
        1i64 << (self.coord_bits() - 1)
    }

    /// Bits of a biased coordinate covered by one region at `level`.
    ///
    /// Level 0 is a leaf block, level `depth` is the whole grid.
    pub fn region_bits(&self, level: u8) -> u32 {
        self.leaf_bits as u32 + self.inner_bits as u32 * level as u32
    }

    /// Returns `true` if `coord` is addressable by this layout.
    pub fn contains(&self, coord: Coord) -> bool {
        let half = self.half_extent();
        [coord.x, coord.y, coord.z]
            .iter()
            .all(|&c| (c as i64) >= -half && (c as i64) < half)
    }

    pub(crate) fn to_biased(&self, coord: Coord) -> Option<Biased> {
        if !self.contains(coord) {
            return None;
        }
        let half = self.half_extent();
        Some([
            (coord.x as i64 + half) as u64,
            (coord.y as i64 + half) as u64,
            (coord.z as i64 + half) as u64,
        ])
    }

    pub(crate) fn from_biased(&self, biased: Biased) -> Coord {
        let half = self.half_extent();
        Point3::new(
            (biased[0] as i64 - half) as i32,
            (biased[1] as i64 - half) as i32,
            (biased[2] as i64 - half) as i32,
        )
    }

    pub(crate) fn checked_biased(&self, coord: Coord) -> Result<Biased, GridError> {
        self.to_biased(coord).ok_or(GridError::OutOfBounds {
            coord,
            half_extent: self.half_extent(),
        })
    }

    /// Child slot inside the inner node at `level` (1..=depth) that contains `biased`.
    pub(crate) fn slot_at(&self, biased: Biased, level: u8) -> usize {
        let shift = self.region_bits(level - 1);
        let mask = (self.inner_dim() - 1) as u64;
        let x = ((biased[0] >> shift) & mask) as usize;
        let y = ((biased[1] >> shift) & mask) as usize;
        let z = ((biased[2] >> shift) & mask) as usize;
        x | (y << self.inner_bits) | (z << (2 * self.inner_bits))
    }

    /// Cell index inside the leaf block that contains `biased`.
    pub(crate) fn leaf_index(&self, biased: Biased) -> usize {
        let mask = (self.leaf_dim() - 1) as u64;
        let x = (biased[0] & mask) as usize;
        let y = (biased[1] & mask) as usize;
        let z = (biased[2] & mask) as usize;
        x | (y << self.leaf_bits) | (z << (2 * self.leaf_bits))
    }

    /// Biased origin of the child in `slot` of a node at `level` whose origin is `origin`.
    pub(crate) fn child_origin(&self, origin: Biased, level: u8, slot: usize) -> Biased {
        let shift = self.region_bits(level - 1);
        let mask = self.inner_dim() - 1;
        let x = (slot & mask) as u64;
        let y = ((slot >> self.inner_bits) & mask) as u64;
        let z = ((slot >> (2 * self.inner_bits)) & mask) as u64;
        [
            origin[0] + (x << shift),
            origin[1] + (y << shift),
            origin[2] + (z << shift),
        ]
    }

    /// Region key of the region at `level` containing `coord`.
    ///
    /// # Returns
    /// `None` if the coordinate is outside the grid.
    pub fn region_key(&self, coord: Coord, level: u8) -> Option<RegionKey> {
        let biased = self.to_biased(coord)?;
        Some(RegionKey::from_biased(biased, level, self.region_bits(level)))
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        GridLayout {
            depth: DEFAULT_DEPTH,
            inner_bits: DEFAULT_INNER_BITS,
            leaf_bits: DEFAULT_LEAF_BITS,
        }
    }
}

/// Identifies one region of the tree: a coordinate divided by the region's edge length.
///
/// Level-0 keys name leaf blocks; level-`depth` keys are always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionKey {
    /// Tree level of the region.
    pub level: u8,
    /// Region index per axis, counted from the grid's minimum corner.
    pub index: [u64; 3],
}

impl RegionKey {
    pub(crate) fn from_biased(biased: Biased, level: u8, shift: u32) -> Self {
        RegionKey {
            level,
            index: [biased[0] >> shift, biased[1] >> shift, biased[2] >> shift],
        }
    }
}

/// Axis-aligned inclusive box of cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridBounds {
    /// Minimum corner (inclusive).
    pub min: Coord,
    /// Maximum corner (inclusive).
    pub max: Coord,
}

impl GridBounds {
    /// Creates bounds from two corners, ordering each axis.
    pub fn new(a: Coord, b: Coord) -> Self {
        GridBounds {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Bounds covering a single cell.
    pub fn from_point(p: Coord) -> Self {
        GridBounds { min: p, max: p }
    }

    /// Grows the bounds to include `p`.
    pub fn expand_to_include(&mut self, p: Coord) {
        self.min = Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    /// Returns `true` if `p` lies inside the bounds.
    pub fn contains(&self, p: Coord) -> bool {
        (self.min.x..=self.max.x).contains(&p.x)
            && (self.min.y..=self.max.y).contains(&p.y)
            && (self.min.z..=self.max.z).contains(&p.z)
    }

    /// Number of cells covered.
    pub fn volume(&self) -> u64 {
        let dx = (self.max.x as i64 - self.min.x as i64 + 1) as u64;
        let dy = (self.max.y as i64 - self.min.y as i64 + 1) as u64;
        let dz = (self.max.z as i64 - self.min.z as i64 + 1) as u64;
        dx * dy * dz
    }

    /// Iterates every cell in x-major order.
    pub fn cells(&self) -> impl Iterator<Item = Coord> {
        let (min, max) = (self.min, self.max);
        (min.z..=max.z).flat_map(move |z| {
            (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| Point3::new(x, y, z)))
        })
    }
}
