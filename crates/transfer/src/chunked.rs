use std::collections::HashSet;
use std::ops::Range;

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::TransferError;

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Strips the quoting storage backends put around entity tags.
///
/// `"9b2cf535f27731c974343645a3985328"` becomes `9b2cf535f27731c974343645a3985328`.
pub fn unquote_entity_tag(raw: &str) -> String {
    raw.replace('"', "")
}

// ---------------------------------------------------------------------------
// PartPlan
// ---------------------------------------------------------------------------

/// Splits a blob of `file_size` bytes into fixed-size, 1-based parts.
///
/// The last part carries the remainder and may be shorter than `part_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartPlan {
    file_size: u64,
    part_size: u64,
    part_count: u32,
}

impl PartPlan {
    /// Plans parts for a blob. Rejects a zero `part_size`.
    pub fn new(file_size: u64, part_size: u64) -> Result<Self, TransferError> {
        if part_size == 0 {
            return Err(TransferError::InvalidPartSize);
        }
        let part_count = u32::try_from(file_size.div_ceil(part_size))
            .map_err(|_| TransferError::InvalidPartSize)?;
        Ok(Self {
            file_size,
            part_size,
            part_count,
        })
    }

    /// Number of parts: `ceil(file_size / part_size)`.
    pub fn part_count(&self) -> u32 {
        self.part_count
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn part_size(&self) -> u64 {
        self.part_size
    }

    /// Byte range of part `part_number`: `[(n-1)*part_size, min(n*part_size, file_size))`.
    pub fn range(&self, part_number: u32) -> Result<Range<u64>, TransferError> {
        if part_number == 0 || part_number > self.part_count {
            return Err(TransferError::PartOutOfRange {
                part_number,
                part_count: self.part_count,
            });
        }
        let n = u64::from(part_number);
        let start = (n - 1) * self.part_size;
        let end = (n * self.part_size).min(self.file_size);
        Ok(start..end)
    }

    /// Returns the bytes of part `part_number` without copying.
    pub fn slice(&self, blob: &Bytes, part_number: u32) -> Result<Bytes, TransferError> {
        if blob.len() as u64 != self.file_size {
            return Err(TransferError::SizeMismatch {
                expected: self.file_size,
                actual: blob.len() as u64,
            });
        }
        let range = self.range(part_number)?;
        Ok(blob.slice(range.start as usize..range.end as usize))
    }

    /// Part numbers not yet in `completed`, ascending.
    pub fn pending<I>(&self, completed: I) -> Vec<u32>
    where
        I: IntoIterator<Item = u32>,
    {
        let done: HashSet<u32> = completed.into_iter().collect();
        (1..=self.part_count)
            .filter(|n| !done.contains(n))
            .collect()
    }
}
