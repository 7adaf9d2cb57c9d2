//! Sequential, resumable bulk sync runner.

use chrono::NaiveDate;
use procura_protocol::SyncWindowRequest;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::SyncBackend;
use crate::error::SyncError;
use crate::types::{SyncEvent, SyncSummary, SyncWindow, WindowStatus};
use crate::window::plan_windows;

/// Syncs a date range window by window.
///
/// Windows run one at a time in date order. A failed window does not stop the
/// run; cancelling aborts the window in flight and stops. Calling
/// [`run`](Self::run) again retries every window that is not done.
pub struct BulkSync {
    windows: Vec<SyncWindow>,
    events_tx: mpsc::Sender<SyncEvent>,
    events_rx: Option<mpsc::Receiver<SyncEvent>>,
}

impl BulkSync {
    /// Plans the windows for `from..=to`.
    pub fn new(from: NaiveDate, to: NaiveDate, window_days: u32) -> Result<Self, SyncError> {
        let windows = plan_windows(from, to, window_days)?;
        let (events_tx, events_rx) = mpsc::channel(256);
        Ok(Self {
            windows,
            events_tx,
            events_rx: Some(events_rx),
        })
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<SyncEvent>> {
        self.events_rx.take()
    }

    pub fn windows(&self) -> &[SyncWindow] {
        &self.windows
    }

    /// Percentage of windows done, rounded half-up.
    pub fn progress(&self) -> u8 {
        let total = self.windows.len();
        if total == 0 {
            return 0;
        }
        let done = self.done_count();
        ((done * 200 + total) / (2 * total)) as u8
    }

    /// Aggregated counts for the current window states.
    pub fn summary(&self) -> SyncSummary {
        SyncSummary {
            total: self.windows.len(),
            done: self.done_count(),
            failed: self
                .windows
                .iter()
                .filter(|w| w.status == WindowStatus::Failed)
                .count(),
            synced: self
                .windows
                .iter()
                .filter(|w| w.status == WindowStatus::Done)
                .map(|w| w.synced)
                .sum(),
            cancelled: self
                .windows
                .iter()
                .any(|w| w.status == WindowStatus::Cancelled),
        }
    }

    /// Syncs every window that is not done yet.
    pub async fn run(&mut self, backend: &dyn SyncBackend, cancel: &CancellationToken) -> SyncSummary {
        let pending: Vec<usize> = self
            .windows
            .iter()
            .filter(|w| w.status.needs_sync())
            .map(|w| w.index)
            .collect();
        info!(windows = pending.len(), total = self.windows.len(), "bulk sync started");

        for index in pending {
            let window = &mut self.windows[index];
            window.status = WindowStatus::Running;
            window.message.clear();
            let request = SyncWindowRequest {
                from: window.from,
                to: window.to,
            };
            self.emit(SyncEvent::WindowStarted {
                index,
                from: request.from,
                to: request.to,
            });

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(SyncError::Cancelled),
                res = backend.sync_window(&request) => res,
            };

            let window = &mut self.windows[index];
            let stop = match result {
                Ok(reply) => {
                    window.status = WindowStatus::Done;
                    window.synced = reply.synced;
                    window.message = reply.message.unwrap_or_default();
                    debug!(from = %window.from, to = %window.to, synced = window.synced, "window done");
                    false
                }
                Err(SyncError::Cancelled) => {
                    window.status = WindowStatus::Cancelled;
                    window.message = "Sync cancelled".into();
                    info!(from = %window.from, to = %window.to, "window cancelled");
                    true
                }
                Err(e) => {
                    window.status = WindowStatus::Failed;
                    window.message = e.to_string();
                    warn!(from = %window.from, to = %window.to, error = %e, "window failed");
                    false
                }
            };

            let finished = window.clone();
            self.emit(SyncEvent::WindowFinished(finished));
            self.emit(SyncEvent::Progress {
                done: self.done_count(),
                total: self.windows.len(),
                percent: self.progress(),
            });
            if stop {
                break;
            }
        }

        let summary = self.summary();
        info!(
            done = summary.done,
            failed = summary.failed,
            synced = summary.synced,
            cancelled = summary.cancelled,
            "bulk sync finished"
        );
        self.emit(SyncEvent::Finished(summary));
        summary
    }

    fn done_count(&self) -> usize {
        self.windows
            .iter()
            .filter(|w| w.status == WindowStatus::Done)
            .count()
    }

    fn emit(&self, event: SyncEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            debug!(error = %e, "sync event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SyncFuture;
    use procura_protocol::SyncWindowResponse;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[derive(Default)]
    struct MockSync {
        calls: Mutex<Vec<NaiveDate>>,
        fail_from: Mutex<HashSet<NaiveDate>>,
        hang_from: Mutex<Option<NaiveDate>>,
        hang_started: Notify,
    }

    impl MockSync {
        fn calls(&self) -> Vec<NaiveDate> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SyncBackend for MockSync {
        fn sync_window(&self, request: &SyncWindowRequest) -> SyncFuture<'_> {
            let from = request.from;
            self.calls.lock().unwrap().push(from);
            let fail = self.fail_from.lock().unwrap().contains(&from);
            let hang = *self.hang_from.lock().unwrap() == Some(from);
            Box::pin(async move {
                if hang {
                    self.hang_started.notify_one();
                    std::future::pending::<()>().await;
                }
                if fail {
                    return Err(SyncError::Api {
                        status: 500,
                        body: "boom".into(),
                    });
                }
                Ok(SyncWindowResponse {
                    synced: 10,
                    message: None,
                })
            })
        }
    }

    #[tokio::test]
    async fn syncs_all_windows_in_order() {
        let backend = MockSync::default();
        let mut sync = BulkSync::new(day(2024, 1, 1), day(2024, 1, 20), 7).unwrap();
        let summary = sync.run(&backend, &CancellationToken::new()).await;

        assert_eq!(backend.calls(), vec![day(2024, 1, 1), day(2024, 1, 8), day(2024, 1, 15)]);
        assert_eq!(
            summary,
            SyncSummary {
                total: 3,
                done: 3,
                failed: 0,
                synced: 30,
                cancelled: false
            }
        );
        assert!(summary.is_complete());
        assert_eq!(sync.progress(), 100);
    }

    #[tokio::test]
    async fn failed_window_does_not_stop_run() {
        let backend = MockSync::default();
        backend.fail_from.lock().unwrap().insert(day(2024, 1, 8));
        let mut sync = BulkSync::new(day(2024, 1, 1), day(2024, 1, 21), 7).unwrap();

        let summary = sync.run(&backend, &CancellationToken::new()).await;
        assert_eq!(backend.calls().len(), 3);
        assert_eq!(summary.done, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.synced, 20);
        assert_eq!(sync.windows()[1].status, WindowStatus::Failed);
        assert!(sync.windows()[1].message.contains("500"));
        assert_eq!(sync.progress(), 67);
    }

    #[tokio::test]
    async fn rerun_retries_only_unfinished_windows() {
        let backend = MockSync::default();
        backend.fail_from.lock().unwrap().insert(day(2024, 1, 8));
        let mut sync = BulkSync::new(day(2024, 1, 1), day(2024, 1, 21), 7).unwrap();
        sync.run(&backend, &CancellationToken::new()).await;

        backend.fail_from.lock().unwrap().clear();
        backend.calls.lock().unwrap().clear();
        let summary = sync.run(&backend, &CancellationToken::new()).await;

        assert_eq!(backend.calls(), vec![day(2024, 1, 8)]);
        assert!(summary.is_complete());
        assert_eq!(summary.synced, 30);
        assert!(sync.windows()[1].message.is_empty());
    }

    #[tokio::test]
    async fn cancel_aborts_window_and_stops() {
        let backend = MockSync::default();
        *backend.hang_from.lock().unwrap() = Some(day(2024, 1, 8));
        let mut sync = BulkSync::new(day(2024, 1, 1), day(2024, 1, 21), 7).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        let (summary, ()) = tokio::join!(sync.run(&backend, &cancel), async {
            backend.hang_started.notified().await;
            trigger.cancel();
        });

        assert!(summary.cancelled);
        assert_eq!(summary.done, 1);
        let statuses: Vec<_> = sync.windows().iter().map(|w| w.status).collect();
        assert_eq!(
            statuses,
            vec![WindowStatus::Done, WindowStatus::Cancelled, WindowStatus::Pending]
        );
        assert_eq!(backend.calls().len(), 2);

        // Resume with a fresh token picks up where the run stopped.
        *backend.hang_from.lock().unwrap() = None;
        let summary = sync.run(&backend, &CancellationToken::new()).await;
        assert!(summary.is_complete());
        assert!(!summary.cancelled);
        assert_eq!(backend.calls().len(), 4);
    }

    #[tokio::test]
    async fn emits_progress_events() {
        let backend = MockSync::default();
        let mut sync = BulkSync::new(day(2024, 1, 1), day(2024, 1, 3), 1).unwrap();
        let mut events = sync.take_events().unwrap();
        assert!(sync.take_events().is_none());

        sync.run(&backend, &CancellationToken::new()).await;

        let mut percents = Vec::new();
        let mut started = 0;
        let mut finished = None;
        while let Ok(event) = events.try_recv() {
            match event {
                SyncEvent::WindowStarted { .. } => started += 1,
                SyncEvent::Progress { percent, .. } => percents.push(percent),
                SyncEvent::Finished(summary) => finished = Some(summary),
                SyncEvent::WindowFinished(w) => assert_eq!(w.status, WindowStatus::Done),
            }
        }
        assert_eq!(started, 3);
        assert_eq!(percents, vec![33, 67, 100]);
        assert_eq!(finished.unwrap().done, 3);
    }

    #[test]
    fn invalid_range_is_rejected() {
        assert!(BulkSync::new(day(2024, 2, 1), day(2024, 1, 1), 7).is_err());
    }
}
