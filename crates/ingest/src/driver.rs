//! Per-file transfer: chunked upload followed by finalize.

use std::future::Future;

use procura_protocol::{ChunkHeader, EntryStatus, FinalizeRequest, FinalizeResponse};
use procura_transfer::{ChunkReader, FileRef, upload_percent};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::IngestBackend;
use crate::cancel::CancelSlot;
use crate::entry::{EntryId, QueueEntry, TransferOutcome};
use crate::error::{IngestError, StoreError};
use crate::store::{QueueStore, SharedStore, lock_store};
use crate::types::{EventSink, IngestEvent};

pub(crate) const MSG_UPLOADING: &str = "Uploading";
pub(crate) const MSG_AWAITING_PROCESSING: &str = "Uploaded, awaiting processing";
pub(crate) const MSG_PROCESSED: &str = "Processed successfully";
pub(crate) const MSG_CANCELLED: &str = "Upload cancelled by user";
const MSG_REJECTED: &str = "server rejected the file";

/// Runs the transfer of one queue entry.
///
/// Holds borrowed handles to the queue's shared state; the scheduler builds
/// one per file.
pub(crate) struct TransferDriver<'a> {
    backend: &'a dyn IngestBackend,
    store: &'a SharedStore,
    cancel: &'a CancelSlot,
    events: &'a EventSink,
    chunk_size: usize,
}

impl<'a> TransferDriver<'a> {
    pub(crate) fn new(
        backend: &'a dyn IngestBackend,
        store: &'a SharedStore,
        cancel: &'a CancelSlot,
        events: &'a EventSink,
        chunk_size: usize,
    ) -> Self {
        Self {
            backend,
            store,
            cancel,
            events,
            chunk_size,
        }
    }

    /// Uploads and finalizes the entry `id`.
    ///
    /// Fails with a [`StoreError`] only when the entry cannot be started
    /// (removed, no longer pending, or another entry is active). Once started
    /// the entry always ends `Completed`, `Failed` or `Cancelled`, also when
    /// the returned future is dropped before it resolves.
    pub(crate) async fn transfer(&self, id: &EntryId) -> Result<TransferOutcome, StoreError> {
        let started = self.update(|s| s.transition(id, EntryStatus::Uploading, MSG_UPLOADING))?;
        info!(entry = %id, file = %started.name(), bytes = started.size(), "transfer started");

        let token = self.cancel.begin();
        let in_flight = InFlight {
            driver: self,
            id,
            armed: true,
        };
        let result = self.upload_and_finalize(id, started.file.clone(), &token).await;
        in_flight.settle();

        let outcome = match result {
            Ok(resp) => {
                let message = resp
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| MSG_PROCESSED.to_string());
                self.finish(id, EntryStatus::Completed, message);
                info!(entry = %id, "transfer completed");
                TransferOutcome::Success
            }
            Err(e) if e.is_cancelled() => {
                self.finish(id, EntryStatus::Cancelled, MSG_CANCELLED);
                info!(entry = %id, "transfer cancelled");
                TransferOutcome::Aborted
            }
            Err(e) => {
                let detail = e.to_string();
                self.finish(id, EntryStatus::Failed, detail.clone());
                warn!(entry = %id, error = %detail, "transfer failed");
                TransferOutcome::Error(detail)
            }
        };
        Ok(outcome)
    }

    async fn upload_and_finalize(
        &self,
        id: &EntryId,
        file: FileRef,
        token: &CancellationToken,
    ) -> Result<FinalizeResponse, IngestError> {
        let mut reader = ChunkReader::new(file, self.chunk_size);
        let total = reader.plan().total_chunks();

        while let Some(chunk) = reader.next_chunk() {
            let header = ChunkHeader {
                file_id: id.to_string(),
                chunk_index: chunk.index,
                total_chunks: total,
                checksum: chunk.checksum,
            };
            guarded(token, self.backend.upload_chunk(&header, &chunk.data)).await?;

            let progress = upload_percent(chunk.index + 1, total);
            self.update(|s| s.set_progress(id, progress))?;
            debug!(entry = %id, chunk = chunk.index, total, progress, "chunk uploaded");
        }

        self.update(|s| s.transition(id, EntryStatus::Processing, MSG_AWAITING_PROCESSING))?;

        let request = FinalizeRequest {
            file_id: id.to_string(),
        };
        let resp = guarded(token, self.backend.finalize(&request)).await?;
        if !resp.success {
            return Err(IngestError::Rejected(
                resp.message.unwrap_or_else(|| MSG_REJECTED.to_string()),
            ));
        }
        Ok(resp)
    }

    /// Applies a store mutation and publishes the updated entry.
    fn update<F>(&self, f: F) -> Result<QueueEntry, StoreError>
    where
        F: FnOnce(&mut QueueStore) -> Result<QueueEntry, StoreError>,
    {
        let entry = f(&mut *lock_store(self.store))?;
        self.events.emit(IngestEvent::EntryUpdated(entry.clone()));
        Ok(entry)
    }

    fn finish(&self, id: &EntryId, to: EntryStatus, message: impl Into<String>) {
        let message = message.into();
        if let Err(e) = self.update(|s| s.transition(id, to, message)) {
            warn!(entry = %id, error = %e, "failed to record transfer outcome");
        }
    }
}

/// Disarms the cancel slot when a transfer stops, and marks the entry
/// `Cancelled` if the transfer future was dropped before it settled.
struct InFlight<'d, 'a> {
    driver: &'d TransferDriver<'a>,
    id: &'d EntryId,
    armed: bool,
}

impl InFlight<'_, '_> {
    /// The transfer ran to an outcome; only the slot needs clearing.
    fn settle(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_, '_> {
    fn drop(&mut self) {
        self.driver.cancel.clear();
        if self.armed {
            warn!(entry = %self.id, "transfer dropped in flight");
            self.driver.finish(self.id, EntryStatus::Cancelled, MSG_CANCELLED);
        }
    }
}

/// Awaits `fut` unless `token` fires first.
async fn guarded<T, F>(token: &CancellationToken, fut: F) -> Result<T, IngestError>
where
    F: Future<Output = Result<T, IngestError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(IngestError::Cancelled),
        res = fut => res,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendFuture;
    use procura_transfer::checksum_bytes;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Records chunk headers and replies from a fixed script.
    #[derive(Default)]
    struct ScriptedBackend {
        chunks: StdMutex<Vec<(ChunkHeader, Vec<u8>)>>,
        finalized: StdMutex<Vec<String>>,
        fail_chunk: Option<u64>,
        hang_chunk: Option<u64>,
        finalize_reply: Option<FinalizeResponse>,
    }

    impl IngestBackend for ScriptedBackend {
        fn upload_chunk(&self, header: &ChunkHeader, data: &[u8]) -> BackendFuture<'_, ()> {
            self.chunks
                .lock()
                .unwrap()
                .push((header.clone(), data.to_vec()));
            let fail = self.fail_chunk == Some(header.chunk_index);
            let hang = self.hang_chunk == Some(header.chunk_index);
            Box::pin(async move {
                if hang {
                    std::future::pending::<()>().await;
                }
                if fail {
                    Err(IngestError::Transport("connection reset".into()))
                } else {
                    Ok(())
                }
            })
        }

        fn finalize(&self, request: &FinalizeRequest) -> BackendFuture<'_, FinalizeResponse> {
            self.finalized.lock().unwrap().push(request.file_id.clone());
            let reply = self.finalize_reply.clone().unwrap_or(FinalizeResponse {
                success: true,
                message: Some("3 invoices imported".into()),
            });
            Box::pin(async move { Ok(reply) })
        }
    }

    struct Harness {
        store: SharedStore,
        cancel: CancelSlot,
        events: EventSink,
        events_rx: tokio::sync::mpsc::Receiver<IngestEvent>,
    }

    impl Harness {
        fn new() -> Self {
            let (tx, rx) = tokio::sync::mpsc::channel(1024);
            Self {
                store: SharedStore::new(QueueStore::new()),
                cancel: CancelSlot::default(),
                events: EventSink::new(tx),
                events_rx: rx,
            }
        }

        fn add(&self, name: &str, content: Vec<u8>) -> EntryId {
            let entry = QueueEntry::new(FileRef::from_bytes(name, content));
            let id = entry.id.clone();
            lock_store(&self.store).push(entry);
            id
        }

        fn driver<'a>(&'a self, backend: &'a dyn IngestBackend, chunk: usize) -> TransferDriver<'a> {
            TransferDriver::new(backend, &self.store, &self.cancel, &self.events, chunk)
        }

        fn entry(&self, id: &EntryId) -> QueueEntry {
            lock_store(&self.store).get(id).cloned().unwrap()
        }

        fn progress_events(&mut self, id: &EntryId) -> Vec<(EntryStatus, u8)> {
            let mut seen = Vec::new();
            while let Ok(event) = self.events_rx.try_recv() {
                if let IngestEvent::EntryUpdated(e) = event
                    && e.id == *id
                {
                    seen.push((e.status, e.progress));
                }
            }
            seen
        }
    }

    #[tokio::test]
    async fn uploads_chunks_in_order_then_finalizes() {
        let mut h = Harness::new();
        let id = h.add("po.xml", b"AABBCCDDEE".to_vec());
        let backend = ScriptedBackend::default();

        let outcome = h.driver(&backend, 4).transfer(&id).await.unwrap();
        assert_eq!(outcome, TransferOutcome::Success);

        let chunks = backend.chunks.lock().unwrap();
        let indices: Vec<_> = chunks.iter().map(|(h, _)| h.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(chunks.iter().all(|(h, _)| h.total_chunks == 3));
        assert!(chunks.iter().all(|(h, _)| h.file_id == id.as_str()));
        assert_eq!(chunks[2].1, b"EE");
        assert_eq!(chunks[0].0.checksum, checksum_bytes(b"AABB"));
        assert_eq!(*backend.finalized.lock().unwrap(), vec![id.to_string()]);

        let entry = h.entry(&id);
        assert_eq!(entry.status, EntryStatus::Completed);
        assert_eq!(entry.progress, 100);
        assert_eq!(entry.message, "3 invoices imported");
        drop(chunks);

        let seen = h.progress_events(&id);
        assert_eq!(
            seen,
            vec![
                (EntryStatus::Uploading, 0),
                (EntryStatus::Uploading, 33),
                (EntryStatus::Uploading, 67),
                (EntryStatus::Uploading, 99),
                (EntryStatus::Processing, 99),
                (EntryStatus::Completed, 100),
            ]
        );
    }

    #[tokio::test]
    async fn empty_file_goes_straight_to_finalize() {
        let h = Harness::new();
        let id = h.add("empty.xml", Vec::new());
        let backend = ScriptedBackend::default();

        let outcome = h.driver(&backend, 4).transfer(&id).await.unwrap();
        assert_eq!(outcome, TransferOutcome::Success);
        assert!(backend.chunks.lock().unwrap().is_empty());
        assert_eq!(backend.finalized.lock().unwrap().len(), 1);
        assert_eq!(h.entry(&id).progress, 100);
    }

    #[tokio::test]
    async fn chunk_failure_stops_the_file() {
        let h = Harness::new();
        let id = h.add("po.xml", vec![1u8; 10]);
        let backend = ScriptedBackend {
            fail_chunk: Some(1),
            ..Default::default()
        };

        let outcome = h.driver(&backend, 4).transfer(&id).await.unwrap();
        assert!(matches!(outcome, TransferOutcome::Error(ref d) if d.contains("connection reset")));
        assert_eq!(backend.chunks.lock().unwrap().len(), 2);
        assert!(backend.finalized.lock().unwrap().is_empty());

        let entry = h.entry(&id);
        assert_eq!(entry.status, EntryStatus::Failed);
        assert_eq!(entry.progress, 33);
        assert!(entry.message.contains("connection reset"));
        assert!(!h.cancel.is_armed());
    }

    #[tokio::test]
    async fn rejected_finalize_fails_entry() {
        let h = Harness::new();
        let id = h.add("po.xml", vec![1u8; 3]);
        let backend = ScriptedBackend {
            finalize_reply: Some(FinalizeResponse {
                success: false,
                message: Some("malformed XML".into()),
            }),
            ..Default::default()
        };

        let outcome = h.driver(&backend, 4).transfer(&id).await.unwrap();
        assert!(matches!(outcome, TransferOutcome::Error(_)));
        let entry = h.entry(&id);
        assert_eq!(entry.status, EntryStatus::Failed);
        assert!(entry.message.contains("malformed XML"));
    }

    #[tokio::test]
    async fn blank_server_message_falls_back() {
        let h = Harness::new();
        let id = h.add("po.xml", vec![1u8; 3]);
        let backend = ScriptedBackend {
            finalize_reply: Some(FinalizeResponse {
                success: true,
                message: Some("  ".into()),
            }),
            ..Default::default()
        };

        h.driver(&backend, 4).transfer(&id).await.unwrap();
        assert_eq!(h.entry(&id).message, MSG_PROCESSED);
    }

    #[tokio::test]
    async fn cancelled_token_aborts_transfer() {
        let h = Harness::new();
        let id = h.add("po.xml", vec![1u8; 10]);

        /// Cancels the slot from inside the second chunk request.
        struct CancelOnSecondChunk<'a> {
            slot: &'a CancelSlot,
        }
        impl IngestBackend for CancelOnSecondChunk<'_> {
            fn upload_chunk(&self, header: &ChunkHeader, _data: &[u8]) -> BackendFuture<'_, ()> {
                let index = header.chunk_index;
                Box::pin(async move {
                    if index == 1 {
                        self.slot.cancel();
                        std::future::pending::<()>().await;
                    }
                    Ok(())
                })
            }
            fn finalize(&self, _request: &FinalizeRequest) -> BackendFuture<'_, FinalizeResponse> {
                Box::pin(async { Err(IngestError::Transport("finalize after cancel".into())) })
            }
        }

        let backend = CancelOnSecondChunk { slot: &h.cancel };
        let outcome = h.driver(&backend, 4).transfer(&id).await.unwrap();
        assert_eq!(outcome, TransferOutcome::Aborted);

        let entry = h.entry(&id);
        assert_eq!(entry.status, EntryStatus::Cancelled);
        assert_eq!(entry.message, MSG_CANCELLED);
        assert!(!h.cancel.is_armed());
    }

    #[tokio::test]
    async fn cancel_during_finalize_aborts_processing() {
        let h = Harness::new();
        let id = h.add("po.xml", vec![1u8; 10]);

        /// Accepts every chunk, then cancels the slot while finalize runs.
        struct CancelInFinalize<'a> {
            slot: &'a CancelSlot,
        }
        impl IngestBackend for CancelInFinalize<'_> {
            fn upload_chunk(&self, _header: &ChunkHeader, _data: &[u8]) -> BackendFuture<'_, ()> {
                Box::pin(async { Ok(()) })
            }
            fn finalize(&self, _request: &FinalizeRequest) -> BackendFuture<'_, FinalizeResponse> {
                Box::pin(async move {
                    self.slot.cancel();
                    std::future::pending::<()>().await;
                    Err(IngestError::Transport("finalize after cancel".into()))
                })
            }
        }

        let backend = CancelInFinalize { slot: &h.cancel };
        let outcome = h.driver(&backend, 4).transfer(&id).await.unwrap();
        assert_eq!(outcome, TransferOutcome::Aborted);

        let entry = h.entry(&id);
        assert_eq!(entry.status, EntryStatus::Cancelled);
        assert_eq!(entry.message, MSG_CANCELLED);
        assert_eq!(entry.progress, 99);
        assert!(!h.cancel.is_armed());
    }

    #[tokio::test]
    async fn dropped_transfer_leaves_entry_retryable() {
        let h = Harness::new();
        let id = h.add("po.xml", vec![1u8; 10]);
        let stalled = ScriptedBackend {
            hang_chunk: Some(1),
            ..Default::default()
        };

        let driver = h.driver(&stalled, 4);
        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), driver.transfer(&id)).await;
        assert!(timed_out.is_err());

        let entry = h.entry(&id);
        assert_eq!(entry.status, EntryStatus::Cancelled);
        assert_eq!(entry.message, MSG_CANCELLED);
        assert_eq!(entry.progress, 33);
        assert!(!h.cancel.is_armed());

        lock_store(&h.store).retry(&id).unwrap();
        let backend = ScriptedBackend::default();
        let outcome = h.driver(&backend, 4).transfer(&id).await.unwrap();
        assert_eq!(outcome, TransferOutcome::Success);
        assert_eq!(h.entry(&id).status, EntryStatus::Completed);
    }

    #[tokio::test]
    async fn entry_not_pending_is_not_started() {
        let h = Harness::new();
        let id = h.add("po.xml", vec![1u8; 3]);
        let backend = ScriptedBackend::default();
        h.driver(&backend, 4).transfer(&id).await.unwrap();

        let err = h.driver(&backend, 4).transfer(&id).await.unwrap_err();
        assert!(matches!(err, StoreError::IllegalTransition { .. }));
        assert_eq!(backend.finalized.lock().unwrap().len(), 1);
    }
}
