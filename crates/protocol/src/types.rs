use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of one file in the ingest queue.
///
/// Serialized with the labels the front end displays, so `Failed` goes over
/// the wire as `"error"` and `Cancelled` as `"canceled"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "uploading")]
    Uploading,
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "error")]
    Failed,
    #[serde(rename = "canceled")]
    Cancelled,
}

impl EntryStatus {
    /// Display label for the status.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "error",
            Self::Cancelled => "canceled",
        }
    }

    /// Returns `true` while the transfer driver owns the entry.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Uploading | Self::Processing)
    }

    /// Returns `true` if the next drain pass may pick the entry up.
    pub fn is_eligible(self) -> bool {
        self == Self::Pending
    }

    /// Returns `true` if an explicit retry may reset the entry to `Pending`.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled)
    }

    /// Returns `true` if the entry may be removed from the queue.
    pub fn is_removable(self) -> bool {
        !self.is_active()
    }

    /// Returns `true` if the queue state machine allows `self -> next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use EntryStatus::*;
        matches!(
            (self, next),
            (Pending, Uploading)
                | (Uploading, Processing)
                | (Processing, Completed)
                | (Uploading | Processing, Failed)
                | (Uploading | Processing, Cancelled)
                | (Failed | Cancelled, Pending)
        )
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
