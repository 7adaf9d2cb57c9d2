use std::ops::Range;

use sha2::{Digest, Sha256};

use crate::types::{Chunk, FileRef};
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// ChunkPlan
// ---------------------------------------------------------------------------

/// Chunk boundaries for a payload of `size` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    size: u64,
    chunk_size: u64,
    total_chunks: u64,
}

impl ChunkPlan {
    /// Plans `ceil(size / chunk_size)` chunks.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used. An empty payload
    /// yields zero chunks.
    pub fn new(size: u64, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        } as u64;
        Self {
            size,
            chunk_size,
            total_chunks: size.div_ceil(chunk_size),
        }
    }

    /// Number of chunks.
    pub fn total_chunks(&self) -> u64 {
        self.total_chunks
    }

    /// Effective chunk size in bytes.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Byte range `[index*C, min((index+1)*C, size))` of chunk `index`.
    pub fn range(&self, index: u64) -> Result<Range<u64>, TransferError> {
        if index >= self.total_chunks {
            return Err(TransferError::ChunkOutOfRange {
                index,
                total: self.total_chunks,
            });
        }
        let start = index * self.chunk_size;
        let end = std::cmp::min(start + self.chunk_size, self.size);
        Ok(start..end)
    }
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Cuts a [`FileRef`] into fixed-size chunks with SHA-256 checksums.
pub struct ChunkReader {
    file: FileRef,
    plan: ChunkPlan,
    next_index: u64,
}

impl ChunkReader {
    /// Prepares `file` for chunked reading.
    pub fn new(file: FileRef, chunk_size: usize) -> Self {
        let plan = ChunkPlan::new(file.size(), chunk_size);
        Self {
            file,
            plan,
            next_index: 0,
        }
    }

    /// Returns the next chunk, or `None` once every chunk has been read.
    pub fn next_chunk(&mut self) -> Option<Chunk> {
        let range = self.plan.range(self.next_index).ok()?;
        let start = range.start as usize;
        let end = range.end as usize;
        let data = self.file.content()[start..end].to_vec();
        let chunk = Chunk {
            index: self.next_index,
            total: self.plan.total_chunks(),
            offset: range.start,
            checksum: checksum_bytes(&data),
            data,
        };
        self.next_index += 1;
        Some(chunk)
    }

    /// Chunk boundaries for the file being read.
    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }

    /// Chunks not yet returned.
    pub fn remaining(&self) -> u64 {
        self.plan.total_chunks() - self.next_index
    }
}

impl Iterator for ChunkReader {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        self.next_chunk()
    }
}
