//! The fixed-size byte buffer backing every block.
//!
//! The arena knows nothing about blocks; it only enforces that every access
//! stays inside the buffer. Placement is the block table's job.

use crate::error::{HeapError, Result};

/// A single contiguous byte buffer, allocated once.
pub struct Arena {
    bytes: Box<[u8]>,
}

impl Arena {
    /// Allocate a zeroed arena of `total_size` bytes.
    ///
    /// # Errors
    /// `Config` if the system cannot provide the buffer.
    pub fn new(total_size: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(total_size)
            .map_err(|e| HeapError::Config {
                field: "arena_size".to_string(),
                cause: format!("cannot reserve {total_size} bytes: {e}"),
            })?;
        bytes.resize(total_size, 0u8);
        Ok(Self {
            bytes: bytes.into_boxed_slice(),
        })
    }

    /// Total size in bytes.
    pub fn total_size(&self) -> usize {
        self.bytes.len()
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn read(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let range = self.range(offset, len)?;
        Ok(&self.bytes[range])
    }

    /// Copy `data` into the arena at `offset`.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let range = self.range(offset, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// Zero `len` bytes starting at `offset`.
    pub fn zero(&mut self, offset: usize, len: usize) -> Result<()> {
        let range = self.range(offset, len)?;
        self.bytes[range].fill(0);
        Ok(())
    }

    /// Move `len` bytes from `src` to `dst`; the ranges may overlap.
    pub fn move_within(&mut self, src: usize, dst: usize, len: usize) -> Result<()> {
        let src_range = self.range(src, len)?;
        self.range(dst, len)?;
        self.bytes.copy_within(src_range, dst);
        Ok(())
    }

    fn range(&self, offset: usize, len: usize) -> Result<std::ops::Range<usize>> {
        match offset.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(offset..end),
            _ => Err(HeapError::ArenaBounds {
                offset: offset as u64,
                len: len as u64,
                total_size: self.bytes.len() as u64,
            }),
        }
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("total_size", &self.bytes.len())
            .finish()
    }
}
