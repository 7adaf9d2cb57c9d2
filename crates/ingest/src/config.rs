//! Ingest queue and server endpoint configuration.

use procura_transfer::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FILE_BYTES, IntakeRules};
use serde::{Deserialize, Serialize};

use crate::notice::DEFAULT_NOTICE_CAPACITY;

/// Queue behavior and intake limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Bytes per uploaded chunk.
    pub chunk_size_bytes: usize,
    /// Accepted file extensions, case-insensitive.
    pub allowed_extensions: Vec<String>,
    /// Largest accepted file in bytes.
    pub max_file_bytes: u64,
    /// Start draining automatically when files are submitted or retried.
    pub auto_drain: bool,
    /// Capacity of the event channel returned by `take_events`.
    pub event_buffer: usize,
    /// Notices kept in the queue's history.
    pub notice_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            allowed_extensions: vec!["xml".into()],
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            auto_drain: true,
            event_buffer: 256,
            notice_capacity: DEFAULT_NOTICE_CAPACITY,
        }
    }
}

impl IngestConfig {
    /// Intake rules derived from the configured types and size limit.
    pub fn rules(&self) -> IntakeRules {
        IntakeRules::new(&self.allowed_extensions, self.max_file_bytes)
    }
}

/// Remote document API endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL, e.g. `https://procura.example.com`.
    pub base_url: String,
    /// Bearer token sent with every request; empty means none.
    pub api_token: String,
    pub chunk_path: String,
    pub finalize_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            api_token: String::new(),
            chunk_path: "/api/invoices/upload-chunk".into(),
            finalize_path: "/api/invoices/process".into(),
        }
    }
}

impl ServerConfig {
    /// Joins `path` onto the base URL without doubling slashes.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
