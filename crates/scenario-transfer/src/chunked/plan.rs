//! Part layout of a file.

use std::ops::Range;

use crate::error::TransferError;

/// How a file of `size` bytes is split into parts of `chunk_size` bytes.
///
/// Parts are numbered from 1. A zero-byte file is a single empty part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    size: u64,
    chunk_size: u64,
    parts: u32,
}

impl ChunkPlan {
    /// Plan the parts of a file.
    pub fn new(size: u64, chunk_size: u64) -> Result<Self, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::ZeroChunkSize);
        }
        let parts = size.div_ceil(chunk_size).max(1);
        let parts = u32::try_from(parts).map_err(|_| TransferError::TooManyParts { size, chunk_size })?;
        Ok(Self {
            size,
            chunk_size,
            parts,
        })
    }

    /// Number of parts.
    pub fn part_count(&self) -> u32 {
        self.parts
    }

    /// File size.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Byte range of a 1-based part, or `None` if out of range.
    pub fn range(&self, part_number: u32) -> Option<Range<u64>> {
        if part_number == 0 || part_number > self.parts {
            return None;
        }
        let start = u64::from(part_number - 1) * self.chunk_size;
        let end = (start + self.chunk_size).min(self.size);
        Some(start..end)
    }

    /// Iterate `(part_number, range)` in part order.
    pub fn parts(&self) -> impl Iterator<Item = (u32, Range<u64>)> + '_ {
        (1..=self.parts).filter_map(|n| self.range(n).map(|r| (n, r)))
    }
}
