//! Ingest queue: intake, drain scheduling, retry, removal and cancellation.
//!
//! Files are transferred strictly one at a time. A drain pass snapshots the
//! pending entries when it starts and works through them in queue order;
//! a failed file does not stop the pass, a cancelled one does.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use procura_transfer::{FileRef, IntakeRules};
use tokio::sync::{Mutex, Notify, mpsc};
use tracing::{debug, info, warn};

use crate::backend::IngestBackend;
use crate::cancel::CancelSlot;
use crate::config::IngestConfig;
use crate::driver::TransferDriver;
use crate::entry::{EntryId, QueueEntry, TransferOutcome};
use crate::error::StoreError;
use crate::intake;
use crate::notice::{Notice, NoticeLevel, NoticeLog};
use crate::store::{QueueStore, SharedStore, lock_store};
use crate::types::{DrainSummary, EventSink, IngestEvent, IntakeReport};

/// Client-side controller for the document ingestion queue.
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct IngestQueue {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn IngestBackend>,
    config: IngestConfig,
    rules: IntakeRules,
    store: SharedStore,
    notices: Mutex<NoticeLog>,
    cancel: CancelSlot,
    /// Set while a drain pass runs.
    draining: AtomicBool,
    /// Background drain loops started by `trigger` and not yet finished.
    loops: AtomicUsize,
    idle: Notify,
    events: EventSink,
    events_rx: std::sync::Mutex<Option<mpsc::Receiver<IngestEvent>>>,
}

impl IngestQueue {
    /// Creates an empty queue talking to `backend`.
    pub fn new(backend: Arc<dyn IngestBackend>, config: IngestConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));
        Self {
            inner: Arc::new(Inner {
                backend,
                rules: config.rules(),
                notices: Mutex::new(NoticeLog::new(config.notice_capacity)),
                config,
                store: SharedStore::new(QueueStore::new()),
                cancel: CancelSlot::default(),
                draining: AtomicBool::new(false),
                loops: AtomicUsize::new(0),
                idle: Notify::new(),
                events: EventSink::new(events_tx),
                events_rx: std::sync::Mutex::new(Some(events_rx)),
            }),
        }
    }

    /// Takes the event receiver. Only the first call returns `Some`.
    pub fn take_events(&self) -> Option<mpsc::Receiver<IngestEvent>> {
        self.inner.events_rx.lock().ok().and_then(|mut rx| rx.take())
    }

    /// Validates and enqueues `files`.
    ///
    /// Emits one notice per refused file, one summary for duplicates and one
    /// for the accepted batch, then starts a drain if anything was added.
    pub async fn submit(&self, files: Vec<FileRef>) -> IntakeReport {
        let admission = {
            let mut store = lock_store(&self.inner.store);
            let admission = intake::admit(&store, &self.inner.rules, files);
            for entry in &admission.entries {
                store.push(entry.clone());
            }
            admission
        };

        for entry in &admission.entries {
            debug!(entry = %entry.id, file = %entry.name(), bytes = entry.size(), "file queued");
            self.inner
                .events
                .emit(IngestEvent::EntryUpdated(entry.clone()));
        }

        for rejection in &admission.rejected {
            warn!(error = %rejection, "file rejected");
            self.notify(|log| log.error("File rejected", rejection.to_string()))
                .await;
        }

        let duplicate_names: Vec<&str> = admission
            .duplicates
            .iter()
            .map(|d| d.file_name())
            .collect();

        if !admission.entries.is_empty() {
            if !duplicate_names.is_empty() {
                let detail = format!(
                    "{} file(s) skipped: {}",
                    duplicate_names.len(),
                    duplicate_names.join(", ")
                );
                self.notify(|log| log.warning("Already queued", detail))
                    .await;
            }
            let detail = format!("{} file(s) added to the queue", admission.entries.len());
            self.notify(|log| log.success("Files queued", detail)).await;
        } else if !duplicate_names.is_empty() {
            let detail = format!("Already queued: {}", duplicate_names.join(", "));
            self.notify(|log| log.push(NoticeLevel::Info, "Nothing to add", Some(detail)))
                .await;
        }

        let report = IntakeReport {
            accepted: admission.entries.iter().map(|e| e.id.clone()).collect(),
            rejected: admission.rejected,
            duplicates: admission.duplicates,
        };

        if !report.is_empty() && self.inner.config.auto_drain {
            self.trigger();
        }
        report
    }

    /// Resets a failed or cancelled entry to pending and starts a drain.
    pub async fn retry(&self, id: &EntryId) -> Result<QueueEntry, StoreError> {
        let entry = lock_store(&self.inner.store).retry(id)?;
        info!(entry = %id, "retry requested");
        self.inner
            .events
            .emit(IngestEvent::EntryUpdated(entry.clone()));
        if self.inner.config.auto_drain {
            self.trigger();
        }
        Ok(entry)
    }

    /// Removes an entry that is not currently uploading or processing.
    pub async fn remove(&self, id: &EntryId) -> Result<QueueEntry, StoreError> {
        let entry = lock_store(&self.inner.store).remove(id)?;
        debug!(entry = %id, "entry removed");
        self.inner.events.emit(IngestEvent::EntryRemoved(id.clone()));
        Ok(entry)
    }

    /// Cancels the request in flight, if any.
    ///
    /// The active entry ends `Cancelled` and the current drain pass stops;
    /// chunks already acknowledged stay on the server.
    pub fn cancel_current(&self) -> bool {
        let signalled = self.inner.cancel.cancel();
        if signalled {
            info!("cancellation requested");
        }
        signalled
    }

    /// Starts a background drain unless one is already running.
    ///
    /// The background task keeps starting passes while they finish without
    /// cancellation and pending entries remain, so files added during a pass
    /// are picked up by the next one. Returns `false` if nothing was started.
    pub fn trigger(&self) -> bool {
        if self.is_draining() {
            debug!("drain already running");
            return false;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime available; drain not started");
            return false;
        };

        self.inner.loops.fetch_add(1, Ordering::SeqCst);
        let queue = self.clone();
        handle.spawn(async move {
            queue.drain_until_idle().await;
            queue.inner.loops.fetch_sub(1, Ordering::SeqCst);
            queue.inner.idle.notify_waiters();
        });
        true
    }

    /// Runs one drain pass over the entries pending right now.
    ///
    /// Returns `None` without doing anything if another pass is running.
    pub async fn drain(&self) -> Option<DrainSummary> {
        let _guard = DrainGuard::acquire(&self.inner)?;
        Some(self.run_pass().await)
    }

    /// Waits until no drain pass is running or scheduled.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_busy() {
                return;
            }
            notified.await;
        }
    }

    /// Returns `true` while a drain pass runs.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::SeqCst)
    }

    /// All entries in queue order.
    pub async fn entries(&self) -> Vec<QueueEntry> {
        lock_store(&self.inner.store).snapshot()
    }

    /// Looks up one entry.
    pub async fn entry(&self, id: &EntryId) -> Option<QueueEntry> {
        lock_store(&self.inner.store).get(id).cloned()
    }

    /// Recent notices, oldest first.
    pub async fn notices(&self) -> Vec<Notice> {
        self.inner.notices.lock().await.iter().cloned().collect()
    }

    /// Dismisses a notice. Returns `true` if it was present.
    pub async fn dismiss_notice(&self, id: u64) -> bool {
        self.inner.notices.lock().await.dismiss(id)
    }

    fn is_busy(&self) -> bool {
        self.is_draining() || self.inner.loops.load(Ordering::SeqCst) > 0
    }

    async fn drain_until_idle(&self) {
        loop {
            let Some(summary) = self.drain().await else {
                break;
            };
            if summary.cancelled || summary.processed() == 0 {
                break;
            }
            let more = lock_store(&self.inner.store).has_eligible();
            if !more {
                break;
            }
        }
    }

    async fn run_pass(&self) -> DrainSummary {
        let snapshot = lock_store(&self.inner.store).eligible_ids();
        let mut summary = DrainSummary::default();
        if snapshot.is_empty() {
            return summary;
        }
        info!(entries = snapshot.len(), "drain started");

        let driver = TransferDriver::new(
            &*self.inner.backend,
            &self.inner.store,
            &self.inner.cancel,
            &self.inner.events,
            self.inner.config.chunk_size_bytes,
        );

        for id in &snapshot {
            match driver.transfer(id).await {
                Ok(TransferOutcome::Success) => summary.completed += 1,
                Ok(TransferOutcome::Error(_)) => summary.failed += 1,
                Ok(TransferOutcome::Aborted) => {
                    summary.cancelled = true;
                    break;
                }
                Err(e) => {
                    debug!(entry = %id, error = %e, "skipping entry");
                    summary.skipped += 1;
                }
            }
        }

        if summary.cancelled {
            self.notify(|log| {
                log.warning("Upload cancelled", "Remaining files stay in the queue")
            })
            .await;
        } else if summary.processed() > 0 {
            let completed = summary.completed;
            let failed = summary.failed;
            if failed == 0 {
                let detail = format!("{completed} file(s) processed");
                self.notify(|log| log.success("Queue processed", detail))
                    .await;
            } else {
                let detail = format!("{completed} completed, {failed} failed");
                self.notify(|log| log.warning("Queue processed with errors", detail))
                    .await;
            }
        }

        info!(
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            cancelled = summary.cancelled,
            "drain finished"
        );
        self.inner.events.emit(IngestEvent::DrainFinished(summary));
        summary
    }

    async fn notify<F>(&self, f: F)
    where
        F: FnOnce(&mut NoticeLog) -> Notice,
    {
        let notice = f(&mut *self.inner.notices.lock().await);
        self.inner.events.emit(IngestEvent::Notice(notice));
    }
}

/// Marks a drain pass as running for as long as it lives.
struct DrainGuard<'a> {
    inner: &'a Inner,
}

impl<'a> DrainGuard<'a> {
    fn acquire(inner: &'a Inner) -> Option<Self> {
        inner
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { inner })
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.inner.draining.store(false, Ordering::SeqCst);
        self.inner.idle.notify_waiters();
    }
}
