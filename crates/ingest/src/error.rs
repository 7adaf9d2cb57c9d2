//! Ingest error types.

use procura_protocol::EntryStatus;

use crate::entry::EntryId;

/// Errors produced while uploading or finalizing a file.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid API token")]
    InvalidToken,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("processing rejected: {0}")]
    Rejected(String),

    #[error("cancelled")]
    Cancelled,

    #[error("queue error: {0}")]
    Store(#[from] StoreError),

    #[error("transfer error: {0}")]
    Transfer(#[from] procura_transfer::TransferError),
}

impl IngestError {
    /// Returns `true` if the error was caused by the user cancelling.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors produced by queue store mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("entry not found: {0}")]
    NotFound(EntryId),

    #[error("entry {id}: cannot go from {from} to {to}")]
    IllegalTransition {
        id: EntryId,
        from: EntryStatus,
        to: EntryStatus,
    },

    #[error("entry {id} is {status}; cancel the transfer first")]
    Busy { id: EntryId, status: EntryStatus },

    #[error("entry {active} is already transferring")]
    AlreadyActive { active: EntryId },
}
