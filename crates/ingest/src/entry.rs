//! Queue entry model.

use std::fmt;

use procura_protocol::EntryStatus;
use procura_transfer::FileRef;
use serde::{Deserialize, Serialize};

/// Opaque queue entry identifier.
///
/// Sent as `fileId` with every chunk and with the finalize call. Generated
/// from a random UUID, so ids of removed entries are never handed out again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Generates a fresh id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One accepted file and its transfer state.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: EntryId,
    pub file: FileRef,
    pub status: EntryStatus,
    /// Percent 0–100; only meaningful while uploading, processing or completed.
    pub progress: u8,
    /// Last human-readable detail (empty, informational or error text).
    pub message: String,
}

impl QueueEntry {
    /// Creates a pending entry for `file` with a fresh id.
    pub fn new(file: FileRef) -> Self {
        Self {
            id: EntryId::generate(),
            file,
            status: EntryStatus::Pending,
            progress: 0,
            message: String::new(),
        }
    }

    /// File name as submitted.
    pub fn name(&self) -> &str {
        self.file.name()
    }

    /// File size in bytes.
    pub fn size(&self) -> u64 {
        self.file.size()
    }

    /// Returns `true` if `name` and `size` identify the same document.
    pub fn is_same_file(&self, name: &str, size: u64) -> bool {
        self.name() == name && self.size() == size
    }
}

/// Result of one file transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Uploaded and processed.
    Success,
    /// The user cancelled the in-flight request.
    Aborted,
    /// Upload or processing failed; carries the error detail.
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_is_pending() {
        let entry = QueueEntry::new(FileRef::from_bytes("po.xml", b"<po/>".to_vec()));
        assert_eq!(entry.status, EntryStatus::Pending);
        assert_eq!(entry.progress, 0);
        assert!(entry.message.is_empty());
        assert_eq!(entry.size(), 5);
    }

    #[test]
    fn ids_are_unique() {
        let a = EntryId::generate();
        let b = EntryId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn same_file_matches_name_and_size() {
        let entry = QueueEntry::new(FileRef::from_bytes("po.xml", vec![0u8; 10]));
        assert!(entry.is_same_file("po.xml", 10));
        assert!(!entry.is_same_file("po.xml", 11));
        assert!(!entry.is_same_file("PO.xml", 10));
    }

    #[test]
    fn id_serializes_as_plain_string() {
        let id = EntryId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
