//! Bounds-checked positional reads over an immutable byte buffer.

use byteorder::{ByteOrder, LittleEndian};

use super::types::error::{ParadoxError, Result};

/// A little-endian cursor over a borrowed byte slice.
///
/// Every read fails with [`ParadoxError::OutOfBounds`] when fewer bytes
/// remain than requested; a failed read leaves the cursor unchanged.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Move the cursor to an absolute offset in `[0, len]`.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(ParadoxError::OutOfBounds {
                requested: offset,
                remaining: self.data.len(),
            });
        }
        self.pos = offset;
        Ok(())
    }

    /// Advance the cursor by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        let _ = self.read_bytes(n)?;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(LittleEndian::read_u16(bytes))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(LittleEndian::read_u32(bytes))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let bytes = self.read_bytes(2)?;
        Ok(LittleEndian::read_i16(bytes))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(ParadoxError::OutOfBounds {
                requested: n,
                remaining,
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

/// Non-mutating random-access read of a little-endian u16.
pub fn peek_u16_le(data: &[u8], index: usize) -> Option<u16> {
    data.get(index..index + 2).map(LittleEndian::read_u16)
}

/// Non-mutating random-access read of a little-endian u32.
pub fn peek_u32_le(data: &[u8], index: usize) -> Option<u32> {
    data.get(index..index + 4).map(LittleEndian::read_u32)
}
