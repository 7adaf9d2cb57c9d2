//! Network seam between the queue and the document API.
//!
//! The production implementation is [`HttpBackend`](crate::HttpBackend);
//! tests drive the queue with in-memory mocks.

use std::future::Future;
use std::pin::Pin;

use procura_protocol::{ChunkHeader, FinalizeRequest, FinalizeResponse};

use crate::error::IngestError;

/// Boxed future returned by backend calls.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, IngestError>> + Send + 'a>>;

/// Remote endpoints used by the transfer driver.
///
/// Calls are never issued concurrently: the driver awaits each one before
/// starting the next. Dropping a returned future aborts the request.
pub trait IngestBackend: Send + Sync {
    /// Uploads one chunk of a file.
    fn upload_chunk(&self, header: &ChunkHeader, data: &[u8]) -> BackendFuture<'_, ()>;

    /// Asks the server to assemble and process all chunks of a file.
    fn finalize(&self, request: &FinalizeRequest) -> BackendFuture<'_, FinalizeResponse>;
}
