//! Chunk planning and payload slicing for document uploads.
//!
//! Files are held in memory as immutable [`FileRef`] handles and cut into
//! fixed-size chunks by [`ChunkReader`]; [`IntakeRules`] decides which files
//! may enter the upload queue at all.

mod chunked;
mod progress;
mod types;
mod validation;

pub use chunked::{ChunkPlan, ChunkReader, checksum_bytes};
pub use progress::upload_percent;
pub use types::{Chunk, FileRef};
pub use validation::{IntakeRules, ValidationError, file_extension};

/// Default chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Default upper bound for an accepted file: 100 MiB.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 100 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("chunk index {index} out of range (total {total})")]
    ChunkOutOfRange { index: u64, total: u64 },
}
