use serde::{Deserialize, Serialize};

/// Default number of days per sync window.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Bulk sync settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Days covered by each window.
    pub window_days: u32,
    /// Endpoint path, joined onto the server base URL.
    pub sync_path: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            sync_path: "/api/invoices/sync".into(),
        }
    }
}
