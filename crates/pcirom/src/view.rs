//! Bounds-checked reads over a ROM buffer.
//!
//! Option ROMs mix little-endian header fields with byte strings that some tools display in
//! reverse, so range reads take an explicit [`Direction`] rather than assuming an endianness.

use crate::error::{Result, RomError};

/// Order in which [`ByteView::range`] returns bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Low offset to high offset (storage order).
    Forward,
    /// High offset to low offset (display order for little-endian fields).
    Reverse,
}

/// Read-only view over the ROM bytes under analysis.
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        let end = offset.checked_add(len).ok_or(RomError::OutOfRange {
            offset,
            len,
            size: self.bytes.len(),
        })?;
        self.bytes.get(offset..end).ok_or(RomError::OutOfRange {
            offset,
            len,
            size: self.bytes.len(),
        })
    }

    /// Copy the inclusive range `start..=end` in the requested order.
    pub fn range(&self, start: usize, end: usize, direction: Direction) -> Result<Vec<u8>> {
        if end < start {
            return Err(RomError::InvalidRange { start, end });
        }
        let bytes = self.slice(start, end - start + 1)?;
        let mut out = bytes.to_vec();
        if direction == Direction::Reverse {
            out.reverse();
        }
        Ok(out)
    }

    pub fn u8(&self, offset: usize) -> Result<u8> {
        Ok(self.slice(offset, 1)?[0])
    }

    pub fn u16_le(&self, offset: usize) -> Result<u16> {
        let b = self.array::<2>(offset)?;
        Ok(u16::from_le_bytes(b))
    }

    pub fn u16_be(&self, offset: usize) -> Result<u16> {
        let b = self.array::<2>(offset)?;
        Ok(u16::from_be_bytes(b))
    }

    pub fn u32_le(&self, offset: usize) -> Result<u32> {
        let b = self.array::<4>(offset)?;
        Ok(u32::from_le_bytes(b))
    }

    pub fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(offset, N)?);
        Ok(out)
    }

    /// Read `N` bytes, zero-filling whatever lies past the end of the buffer.
    ///
    /// Returns the bytes and whether any had to be filled.
    pub fn array_padded<const N: usize>(&self, offset: usize) -> ([u8; N], bool) {
        let mut out = [0u8; N];
        let avail = self.bytes.get(offset..).unwrap_or(&[]);
        let n = avail.len().min(N);
        out[..n].copy_from_slice(&avail[..n]);
        (out, n < N)
    }

    /// Whether `pattern` occurs at `offset`. Out-of-range reads simply don't match.
    pub fn matches(&self, offset: usize, pattern: &[u8]) -> bool {
        self.slice(offset, pattern.len())
            .is_ok_and(|bytes| bytes == pattern)
    }

    /// First offset at or after `from` where `pattern` occurs.
    pub fn find(&self, from: usize, pattern: &[u8]) -> Option<usize> {
        if pattern.is_empty() {
            return None;
        }
        let haystack = self.bytes.get(from..)?;
        haystack
            .windows(pattern.len())
            .position(|w| w == pattern)
            .map(|pos| from + pos)
    }

    /// Decode `len` bytes at `offset` as UTF-8 text.
    pub fn text(&self, offset: usize, len: usize) -> Result<&'a str> {
        let bytes = self.slice(offset, len)?;
        std::str::from_utf8(bytes).map_err(|_| RomError::InvalidText { offset })
    }

    /// Decode text from `offset` up to (not including) the first `terminator` byte.
    ///
    /// `max_len` bounds the search; a terminator that isn't found within the bound or before the
    /// end of the buffer is an [`RomError::Unterminated`] error.
    pub fn text_until(&self, offset: usize, terminator: u8, max_len: usize) -> Result<&'a str> {
        let rest = self.bytes.get(offset..).ok_or(RomError::OutOfRange {
            offset,
            len: 1,
            size: self.bytes.len(),
        })?;
        let window = &rest[..rest.len().min(max_len)];
        let end = window
            .iter()
            .position(|&b| b == terminator)
            .ok_or(RomError::Unterminated { offset, terminator })?;
        std::str::from_utf8(&window[..end]).map_err(|_| RomError::InvalidText { offset })
    }
}
