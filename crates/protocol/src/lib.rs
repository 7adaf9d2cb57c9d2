//! Wire types for the Procura document ingestion API.
//!
//! Shared between the ingest queue, the bulk sync runner and any test
//! double standing in for the remote server.

pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use messages::{
    ChunkHeader, FinalizeRequest, FinalizeResponse, SyncWindowRequest, SyncWindowResponse,
};
pub use types::EntryStatus;
