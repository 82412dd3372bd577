//! # Cell Value Module
//!
//! The bound every value stored in a grid must satisfy.

use std::fmt::Debug;

use bytemuck::Pod;

/// A value that can be stored in a grid cell.
///
/// `Default` is the "empty" value: cells holding it are not stored, and a leaf
/// block whose cells are all default is pruned. `Pod` lets the serializer copy
/// cells to and from byte streams without a per-type codec.
///
/// Implemented for every type meeting the bounds, so primitives such as `u8`,
/// `i32` or `f32` and `#[repr(C)]` structs deriving `Pod` work out of the box.
pub trait CellValue: Pod + Default + PartialEq + Debug {}

impl<T: Pod + Default + PartialEq + Debug> CellValue for T {}

/// Returns `true` if `value` is the empty value of its type.
#[inline]
pub fn is_default<T: CellValue>(value: &T) -> bool {
    *value == T::default()
}
