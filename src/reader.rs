//! Random-access byte reader
//!
//! The module parser seeks freely inside its input, so it works against the
//! [`DataReader`] trait rather than a forward-only stream. All multi-byte
//! values are big-endian (68000 byte order).

use crate::{CosoError, Result};

/// Random-access, big-endian byte source consumed by the module parser.
pub trait DataReader {
    /// Current read position.
    fn position(&self) -> usize;

    /// Move the read position. Positions past the end are allowed; the next
    /// read fails.
    fn set_position(&mut self, position: usize);

    /// Total size of the underlying data.
    fn size(&self) -> usize;

    /// Read one byte.
    fn read_u8(&mut self) -> Result<u8>;

    /// Read a big-endian 16-bit word.
    fn read_u16(&mut self) -> Result<u16> {
        let hi = self.read_u8()?;
        let lo = self.read_u8()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    /// Read a big-endian 32-bit dword.
    fn read_u32(&mut self) -> Result<u32> {
        let hi = self.read_u16()?;
        let lo = self.read_u16()?;
        Ok(((hi as u32) << 16) | lo as u32)
    }

    /// Read `len` bytes.
    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Read a word without moving the position.
    fn peek_u16(&mut self) -> Result<u16> {
        let position = self.position();
        let value = self.read_u16();
        self.set_position(position);
        value
    }

    /// Advance the position by `count` bytes.
    fn skip(&mut self, count: usize) {
        let position = self.position();
        self.set_position(position + count);
    }
}

/// [`DataReader`] over an in-memory byte slice.
#[derive(Debug, Clone)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> SliceReader<'a> {
    /// Create a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    fn ensure_range(&self, len: usize) -> Result<usize> {
        let end = self
            .position
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(CosoError::UnexpectedEof {
                offset: self.position,
                len,
            })?;
        Ok(end)
    }
}

impl DataReader for SliceReader<'_> {
    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn read_u8(&mut self) -> Result<u8> {
        let end = self.ensure_range(1)?;
        let value = self.data[self.position];
        self.position = end;
        Ok(value)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let end = self.ensure_range(2)?;
        let value = u16::from_be_bytes([self.data[self.position], self.data[self.position + 1]]);
        self.position = end;
        Ok(value)
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let end = self.ensure_range(len)?;
        let bytes = self.data[self.position..end].to_vec();
        self.position = end;
        Ok(bytes)
    }
}
