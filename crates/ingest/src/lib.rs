//! Document ingestion queue: intake, chunked upload, finalize, retry.
//!
//! This crate implements the **client-side controller** that feeds
//! supplier documents to the procurement API. It has no UI dependencies:
//! front ends submit files, observe [`IngestEvent`]s and call retry,
//! remove or cancel. The network is reached through the
//! [`IngestBackend`] trait; [`HttpBackend`] is the production
//! implementation.
//!
//! # Pipeline
//!
//! 1. **Intake**: type and size rules, dedup by name and size
//! 2. **Queue**: entries keyed by id, mutated only through legal transitions
//! 3. **Drain**: one file at a time, in queue order
//! 4. **Upload**: fixed-size chunks, strictly sequential, cancellable
//! 5. **Finalize**: ask the server to assemble and process the file

pub mod backend;
mod cancel;
pub mod config;
mod driver;
pub mod entry;
pub mod error;
pub mod http;
mod intake;
pub mod notice;
pub mod queue;
pub mod store;
pub mod types;

// Re-export primary types for convenience.
pub use backend::IngestBackend;
pub use config::{IngestConfig, ServerConfig};
pub use entry::{EntryId, QueueEntry, TransferOutcome};
pub use error::{IngestError, StoreError};
pub use http::HttpBackend;
pub use notice::{Notice, NoticeLevel, NoticeLog};
pub use procura_protocol::EntryStatus;
pub use procura_transfer::FileRef;
pub use queue::IngestQueue;
pub use store::QueueStore;
pub use types::{DrainSummary, IngestEvent, IntakeReport};
