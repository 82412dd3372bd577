//! # Material Module
//!
//! A small palette of cell materials used by the demo binary and the fill helpers.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// The underlying integer type used to store a material in a grid cell.
pub type MaterialId = u8;

/// Enumerates the materials a demo grid can hold.
///
/// `AIR` is the default cell value and is never stored.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum Material {
    /// Empty space.
    AIR,
    /// Loose soil.
    DIRT,
    /// Soil with a grass top.
    GRASS,
    /// Timber.
    WOOD,
    /// Bedrock.
    STONE,
}

impl Material {
    /// Converts a stored id back into a material.
    ///
    /// # Returns
    /// `None` if the id does not name a material.
    pub fn from_id(id: MaterialId) -> Option<Self> {
        FromPrimitive::from_u8(id)
    }

    /// The id stored in grid cells.
    pub fn id(self) -> MaterialId {
        self as MaterialId
    }

    /// Picks a random non-air material.
    pub fn random(rng: &mut fastrand::Rng) -> Self {
        Material::from_id(rng.u8(1..=4)).unwrap_or(Material::STONE)
    }
}
