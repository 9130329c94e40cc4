//! Bounds-checked cursor over received bytes

use crate::error::{SolarmanError, SolarmanResult};

/// Cursor over a received buffer
///
/// Every short read is reported as `Truncated`, naming the field that did
/// not fit.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Take the next `len` bytes
    pub fn take(&mut self, field: &'static str, len: usize) -> SolarmanResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(SolarmanError::Truncated {
                field,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn u8(&mut self, field: &'static str) -> SolarmanResult<u8> {
        Ok(self.take(field, 1)?[0])
    }

    pub fn array<const N: usize>(&mut self, field: &'static str) -> SolarmanResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(field, N)?);
        Ok(out)
    }

    pub fn u16_be(&mut self, field: &'static str) -> SolarmanResult<u16> {
        Ok(u16::from_be_bytes(self.array(field)?))
    }

    pub fn u16_le(&mut self, field: &'static str) -> SolarmanResult<u16> {
        Ok(u16::from_le_bytes(self.array(field)?))
    }

    pub fn u32_le(&mut self, field: &'static str) -> SolarmanResult<u32> {
        Ok(u32::from_le_bytes(self.array(field)?))
    }
}
