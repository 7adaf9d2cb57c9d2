//! Bulk synchronization of documents by date range.
//!
//! A date range is split into fixed-size windows that are synced one after
//! another. Failed and cancelled windows stay retryable: running the same
//! [`BulkSync`] again only revisits windows that are not done.

pub mod backend;
pub mod config;
pub mod error;
pub mod runner;
pub mod types;
pub mod window;

pub use backend::{HttpSyncBackend, SyncBackend};
pub use config::SyncConfig;
pub use error::SyncError;
pub use runner::BulkSync;
pub use types::{SyncEvent, SyncSummary, SyncWindow, WindowStatus};
pub use window::plan_windows;
