//! Data types for the ingest flow.

use procura_transfer::ValidationError;
use tokio::sync::mpsc;
use tracing::debug;

use crate::entry::{EntryId, QueueEntry};
use crate::notice::Notice;

/// Event emitted while the queue changes.
#[derive(Debug, Clone)]
pub enum IngestEvent {
    /// An entry was added or changed status, progress or message.
    EntryUpdated(QueueEntry),
    /// An entry was removed by the user.
    EntryRemoved(EntryId),
    /// A notice was recorded.
    Notice(Notice),
    /// A drain pass ended.
    DrainFinished(DrainSummary),
}

/// Sending half of the event channel.
///
/// Emitting never waits: with no reader or a full buffer the event is dropped,
/// since the store stays the source of truth.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: mpsc::Sender<IngestEvent>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<IngestEvent>) -> Self {
        Self { tx }
    }

    pub(crate) fn emit(&self, event: IngestEvent) {
        if let Err(e) = self.tx.try_send(event) {
            debug!(error = %e, "ingest event dropped");
        }
    }
}

/// Result of submitting a batch of files.
#[derive(Debug, Clone, Default)]
pub struct IntakeReport {
    /// Ids of the new entries, in submission order.
    pub accepted: Vec<EntryId>,
    /// Files refused for type or size.
    pub rejected: Vec<ValidationError>,
    /// Files dropped because the same name and size is already queued.
    pub duplicates: Vec<ValidationError>,
}

impl IntakeReport {
    /// Returns `true` if nothing was added to the queue.
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Outcome counts for one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub completed: usize,
    pub failed: usize,
    /// Snapshot entries that were removed or changed before their turn.
    pub skipped: usize,
    /// The pass stopped because the user cancelled a transfer.
    pub cancelled: bool,
}

impl DrainSummary {
    /// Entries that reached a terminal outcome during the pass.
    pub fn processed(&self) -> usize {
        self.completed + self.failed + usize::from(self.cancelled)
    }
}
