use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Chunk upload
// ---------------------------------------------------------------------------

/// Multipart field carrying the raw chunk bytes.
pub const FIELD_CHUNK: &str = "chunk";
/// Multipart field carrying the zero-based chunk index.
pub const FIELD_CHUNK_INDEX: &str = "chunkIndex";
/// Multipart field carrying the total chunk count for the file.
pub const FIELD_TOTAL_CHUNKS: &str = "totalChunks";
/// Multipart field carrying the queue entry id.
pub const FIELD_FILE_ID: &str = "fileId";
/// Multipart field carrying the SHA-256 hex digest of the chunk.
pub const FIELD_CHECKSUM: &str = "checksum";

/// Metadata sent alongside each chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkHeader {
    /// Queue entry id; correlates all chunks of one file.
    pub file_id: String,
    pub chunk_index: u64,
    pub total_chunks: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,
}

impl ChunkHeader {
    /// Returns `true` if this header describes the last chunk of the file.
    pub fn is_last(&self) -> bool {
        self.chunk_index + 1 == self.total_chunks
    }
}

// ---------------------------------------------------------------------------
// Finalize
// ---------------------------------------------------------------------------

/// Asks the server to assemble and process the chunks uploaded for a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub file_id: String,
}

/// Server reply to a finalize request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Bulk sync
// ---------------------------------------------------------------------------

/// Synchronizes one inclusive date window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncWindowRequest {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Result of synchronizing one date window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncWindowResponse {
    #[serde(default)]
    pub synced: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_header_field_names() {
        let header = ChunkHeader {
            file_id: "f-1".into(),
            chunk_index: 2,
            total_chunks: 3,
            checksum: String::new(),
        };
        let json = serde_json::to_string(&header).unwrap();
        assert_eq!(json, r#"{"fileId":"f-1","chunkIndex":2,"totalChunks":3}"#);
        assert!(header.is_last());
    }

    #[test]
    fn chunk_header_not_last() {
        let header = ChunkHeader {
            file_id: "f-1".into(),
            chunk_index: 0,
            total_chunks: 3,
            checksum: "ab".into(),
        };
        assert!(!header.is_last());
        assert!(serde_json::to_string(&header).unwrap().contains("\"checksum\":\"ab\""));
    }

    #[test]
    fn finalize_response_defaults() {
        let resp: FinalizeResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.success);
        assert!(resp.message.is_none());

        let resp: FinalizeResponse =
            serde_json::from_str(r#"{"success":false,"message":"bad xml"}"#).unwrap();
        assert!(!resp.success);
        assert_eq!(resp.message.as_deref(), Some("bad xml"));
    }

    #[test]
    fn finalize_request_field_names() {
        let req = FinalizeRequest {
            file_id: "abc".into(),
        };
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"fileId":"abc"}"#);
    }

    #[test]
    fn sync_window_dates_are_iso() {
        let req = SyncWindowRequest {
            from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"from":"2024-01-01","to":"2024-01-07"}"#);
    }

    #[test]
    fn sync_window_response_tolerates_missing_fields() {
        let resp: SyncWindowResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.synced, 0);
        assert!(resp.message.is_none());
    }
}
