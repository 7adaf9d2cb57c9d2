use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::TransferError;

/// An immutable file payload handed to the upload queue.
///
/// Cloning is cheap: the content is shared.
#[derive(Clone)]
pub struct FileRef {
    name: String,
    content: Arc<[u8]>,
}

impl FileRef {
    /// Wraps an in-memory payload under the given file name.
    pub fn from_bytes(name: impl Into<String>, content: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Reads a file from disk. The handle is named after the final path component.
    pub fn read_from(path: &Path) -> Result<Self, TransferError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TransferError::InvalidName(path.display().to_string()))?
            .to_string();
        let content = std::fs::read(path)?;
        Ok(Self::from_bytes(name, content))
    }

    /// File name as submitted (no directory part).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// Full payload.
    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

impl fmt::Debug for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileRef")
            .field("name", &self.name)
            .field("size", &self.size())
            .finish()
    }
}

/// One slice of a file, ready to upload.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Zero-based position within the file.
    pub index: u64,
    /// Number of chunks the file was cut into.
    pub total: u64,
    /// Byte offset within the file.
    pub offset: u64,
    /// Raw chunk data.
    pub data: Vec<u8>,
    /// SHA-256 hex checksum of `data`.
    pub checksum: String,
}

impl Chunk {
    /// Size of this chunk in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
