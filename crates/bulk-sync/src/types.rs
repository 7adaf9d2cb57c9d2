//! Data types for bulk sync runs.

use chrono::NaiveDate;
use serde::Serialize;

/// Lifecycle of one date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowStatus {
    Pending,
    Running,
    Done,
    Failed,
    Cancelled,
}

impl WindowStatus {
    /// Returns `true` if the window still needs to be synced.
    pub fn needs_sync(self) -> bool {
        !matches!(self, Self::Done | Self::Running)
    }
}

/// One inclusive date window of a bulk sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncWindow {
    pub index: usize,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub status: WindowStatus,
    /// Records the server reported for this window.
    pub synced: u64,
    /// Server message or error detail from the last attempt.
    pub message: String,
}

impl SyncWindow {
    pub(crate) fn new(index: usize, from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            index,
            from,
            to,
            status: WindowStatus::Pending,
            synced: 0,
            message: String::new(),
        }
    }

    /// Number of days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

/// Event emitted during a bulk sync run.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    WindowStarted {
        index: usize,
        from: NaiveDate,
        to: NaiveDate,
    },
    WindowFinished(SyncWindow),
    Progress {
        done: usize,
        total: usize,
        percent: u8,
    },
    Finished(SyncSummary),
}

/// Aggregated state after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub total: usize,
    pub done: usize,
    pub failed: usize,
    /// Records synced across all done windows.
    pub synced: u64,
    /// The run stopped because it was cancelled.
    pub cancelled: bool,
}

impl SyncSummary {
    /// Returns `true` once every window is done.
    pub fn is_complete(&self) -> bool {
        self.done == self.total
    }
}
