use chrono::NaiveDate;

/// Errors produced while planning or syncing date windows.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("invalid date range: {from} is after {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[error("window size must be at least one day")]
    ZeroWindow,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid API token")]
    InvalidToken,

    #[error("cancelled")]
    Cancelled,
}
