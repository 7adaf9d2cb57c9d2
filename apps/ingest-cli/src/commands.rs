//! Subcommand implementations.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use procura_bulk_sync::{BulkSync, HttpSyncBackend, SyncEvent, WindowStatus};
use procura_ingest::{
    EntryId, EntryStatus, FileRef, HttpBackend, IngestConfig, IngestEvent, IngestQueue, Notice,
    QueueEntry,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::AppConfig;

/// Uploads `paths` through the ingest queue.
///
/// Returns `false` if any file could not be read, was refused, or ended
/// failed or cancelled.
pub async fn upload(config: &AppConfig, paths: Vec<PathBuf>) -> anyhow::Result<bool> {
    let (files, unreadable) = load_files(paths).await;

    let backend = Arc::new(HttpBackend::new(&config.server)?);
    let queue = IngestQueue::new(
        backend,
        IngestConfig {
            auto_drain: true,
            ..config.ingest.clone()
        },
    );
    let mut events = queue
        .take_events()
        .context("ingest event receiver already taken")?;
    let printer = tokio::spawn(async move {
        let mut last: HashMap<EntryId, EntryStatus> = HashMap::new();
        while let Some(event) = events.recv().await {
            match event {
                IngestEvent::EntryUpdated(entry) => {
                    if last.insert(entry.id.clone(), entry.status) != Some(entry.status) {
                        println!("{}", entry_line(&entry));
                    }
                }
                IngestEvent::Notice(notice) => eprintln!("{}", notice_line(&notice)),
                IngestEvent::EntryRemoved(_) | IngestEvent::DrainFinished(_) => {}
            }
        }
    });

    let report = queue.submit(files).await;
    info!(
        accepted = report.accepted.len(),
        rejected = report.rejected.len(),
        duplicates = report.duplicates.len(),
        "files submitted"
    );

    let on_interrupt = queue.clone();
    let interrupt = tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c, move || {
        on_interrupt.cancel_current()
    }));

    queue.wait_idle().await;
    interrupt.abort();
    let _ = interrupt.await;

    let entries = queue.entries().await;
    drop(queue);
    let _ = printer.await;

    println!();
    for entry in &entries {
        println!("{}", entry_line(entry));
    }
    let unfinished = entries
        .iter()
        .filter(|e| matches!(e.status, EntryStatus::Failed | EntryStatus::Cancelled))
        .count();

    Ok(unreadable == 0 && report.rejected.is_empty() && unfinished == 0)
}

/// Syncs `from..=to` window by window. Returns `false` unless every window
/// ends done.
pub async fn sync(
    config: &AppConfig,
    from: NaiveDate,
    to: NaiveDate,
    window_days: Option<u32>,
) -> anyhow::Result<bool> {
    let backend = HttpSyncBackend::new(
        &config.server.base_url,
        &config.server.api_token,
        &config.sync,
    )?;
    let mut sync = BulkSync::new(from, to, window_days.unwrap_or(config.sync.window_days))?;
    let mut events = sync
        .take_events()
        .context("sync event receiver already taken")?;
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Some(line) = sync_event_line(&event) {
                println!("{line}");
            }
        }
    });

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c, move || {
        let first = !on_interrupt.is_cancelled();
        on_interrupt.cancel();
        first
    }));

    let summary = sync.run(&backend, &cancel).await;
    interrupt.abort();
    drop(sync);
    let _ = printer.await;

    println!(
        "{} of {} windows synced, {} records{}",
        summary.done,
        summary.total,
        summary.synced,
        if summary.cancelled { " (cancelled)" } else { "" }
    );
    Ok(summary.is_complete())
}

/// Calls `cancel` on every signal delivered by `wait` until listening fails.
///
/// A signal that finds nothing to cancel is logged and the next one is
/// still handled.
async fn cancel_on_signal<W, F>(mut wait: W, cancel: impl Fn() -> bool)
where
    W: FnMut() -> F,
    F: Future<Output = std::io::Result<()>>,
{
    while wait().await.is_ok() {
        if cancel() {
            warn!("interrupted; cancelling");
        } else {
            info!("interrupted; nothing in flight to cancel");
        }
    }
}

/// Reads files off the blocking pool. Unreadable files are reported and
/// counted.
async fn load_files(paths: Vec<PathBuf>) -> (Vec<FileRef>, usize) {
    let mut files = Vec::with_capacity(paths.len());
    let mut unreadable = 0;
    for path in paths {
        let shown = path.display().to_string();
        match tokio::task::spawn_blocking(move || FileRef::read_from(&path)).await {
            Ok(Ok(file)) => files.push(file),
            Ok(Err(e)) => {
                eprintln!("{shown}: {e}");
                unreadable += 1;
            }
            Err(e) => {
                eprintln!("{shown}: {e}");
                unreadable += 1;
            }
        }
    }
    (files, unreadable)
}

fn entry_line(entry: &QueueEntry) -> String {
    let mut line = format!("{:<40} {:<10} {:>3}%", entry.name(), entry.status.label(), entry.progress);
    if !entry.message.is_empty() {
        line.push_str("  ");
        line.push_str(&entry.message);
    }
    line
}

fn notice_line(notice: &Notice) -> String {
    match &notice.detail {
        Some(detail) => format!("[{}] {}: {detail}", notice.level.label(), notice.title),
        None => format!("[{}] {}", notice.level.label(), notice.title),
    }
}

fn sync_event_line(event: &SyncEvent) -> Option<String> {
    match event {
        SyncEvent::WindowFinished(w) => {
            let outcome = match w.status {
                WindowStatus::Done => format!("{} records", w.synced),
                WindowStatus::Failed => format!("failed: {}", w.message),
                WindowStatus::Cancelled => "cancelled".into(),
                WindowStatus::Pending | WindowStatus::Running => return None,
            };
            Some(format!("{} .. {}  {outcome}", w.from, w.to))
        }
        SyncEvent::Progress { percent, .. } => Some(format!("{percent}%")),
        SyncEvent::WindowStarted { .. } | SyncEvent::Finished(_) => None,
    }
}
