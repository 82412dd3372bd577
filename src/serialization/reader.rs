//! Bounds-checked cursor over a serialized grid.

use crate::error::FormatError;
use crate::voxels::cell::CellValue;

/// Reads little-endian fields from a byte slice, failing with
/// [`FormatError::Truncated`] instead of panicking when data runs out.
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        ByteReader { bytes, offset: 0 }
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub(crate) fn take(&mut self, needed: usize) -> Result<&'a [u8], FormatError> {
        if needed > self.remaining() {
            return Err(FormatError::Truncated {
                offset: self.offset,
                needed,
                remaining: self.remaining(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, FormatError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, FormatError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, FormatError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, FormatError> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    pub(crate) fn read_magic(&mut self) -> Result<[u8; 4], FormatError> {
        self.array()
    }

    /// Reads one cell stored as raw `Pod` bytes.
    pub(crate) fn read_cell<T: CellValue>(&mut self) -> Result<T, FormatError> {
        Ok(bytemuck::pod_read_unaligned(self.take(std::mem::size_of::<T>())?))
    }
}
