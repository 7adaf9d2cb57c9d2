//! HTTP implementation of [`IngestBackend`].
//!
//! Chunks go out as `multipart/form-data`, finalize as a JSON body. An API
//! token, when configured, is sent as a Bearer header on every request.

use procura_protocol::messages::{
    FIELD_CHECKSUM, FIELD_CHUNK, FIELD_CHUNK_INDEX, FIELD_FILE_ID, FIELD_TOTAL_CHUNKS,
};
use procura_protocol::{ChunkHeader, FinalizeRequest, FinalizeResponse};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::backend::{BackendFuture, IngestBackend};
use crate::config::ServerConfig;
use crate::error::IngestError;

/// Document API client used by the queue.
pub struct HttpBackend {
    http: reqwest::Client,
    chunk_url: String,
    finalize_url: String,
}

impl HttpBackend {
    /// Creates a client for the endpoints in `server`.
    pub fn new(server: &ServerConfig) -> Result<Self, IngestError> {
        let mut headers = HeaderMap::new();
        if !server.api_token.is_empty() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", server.api_token))
                    .map_err(|_| IngestError::InvalidToken)?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            chunk_url: server.url(&server.chunk_path),
            finalize_url: server.url(&server.finalize_path),
        })
    }

    async fn post_chunk(&self, header: ChunkHeader, data: Vec<u8>) -> Result<(), IngestError> {
        let part = Part::bytes(data)
            .file_name(header.file_id.clone())
            .mime_str("application/octet-stream")?;
        let mut form = Form::new()
            .part(FIELD_CHUNK, part)
            .text(FIELD_CHUNK_INDEX, header.chunk_index.to_string())
            .text(FIELD_TOTAL_CHUNKS, header.total_chunks.to_string())
            .text(FIELD_FILE_ID, header.file_id.clone());
        if !header.checksum.is_empty() {
            form = form.text(FIELD_CHECKSUM, header.checksum.clone());
        }

        let resp = self.http.post(&self.chunk_url).multipart(form).send().await?;
        check_status(resp).await?;
        debug!(
            file_id = %header.file_id,
            chunk = header.chunk_index,
            total = header.total_chunks,
            "chunk accepted"
        );
        Ok(())
    }

    async fn post_finalize(&self, request: FinalizeRequest) -> Result<FinalizeResponse, IngestError> {
        let resp = self
            .http
            .post(&self.finalize_url)
            .json(&request)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let body = resp.text().await?;
        Ok(parse_finalize(&body))
    }
}

impl IngestBackend for HttpBackend {
    fn upload_chunk(&self, header: &ChunkHeader, data: &[u8]) -> BackendFuture<'_, ()> {
        Box::pin(self.post_chunk(header.clone(), data.to_vec()))
    }

    fn finalize(&self, request: &FinalizeRequest) -> BackendFuture<'_, FinalizeResponse> {
        Box::pin(self.post_finalize(request.clone()))
    }
}

/// Maps non-2xx responses to [`IngestError::Api`].
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, IngestError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(IngestError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Reads a finalize reply.
///
/// An empty body counts as success. A body that is not a JSON reply is
/// taken as a success message.
fn parse_finalize(body: &str) -> FinalizeResponse {
    let body = body.trim();
    if body.is_empty() {
        return FinalizeResponse {
            success: true,
            message: None,
        };
    }
    serde_json::from_str(body).unwrap_or_else(|_| FinalizeResponse {
        success: true,
        message: Some(body.to_string()),
    })
}
