//! Network seam for bulk sync and its HTTP implementation.

use std::future::Future;
use std::pin::Pin;

use procura_protocol::{SyncWindowRequest, SyncWindowResponse};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::SyncError;

/// Boxed future returned by [`SyncBackend::sync_window`].
pub type SyncFuture<'a> =
    Pin<Box<dyn Future<Output = Result<SyncWindowResponse, SyncError>> + Send + 'a>>;

/// Server endpoint that synchronizes one date window.
pub trait SyncBackend: Send + Sync {
    fn sync_window(&self, request: &SyncWindowRequest) -> SyncFuture<'_>;
}

/// Posts sync windows as JSON to the procurement API.
pub struct HttpSyncBackend {
    http: reqwest::Client,
    url: String,
}

impl HttpSyncBackend {
    /// Creates a client for `base_url` plus the configured sync path.
    /// An empty `api_token` sends no Authorization header.
    pub fn new(base_url: &str, api_token: &str, config: &SyncConfig) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        if !api_token.is_empty() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {api_token}"))
                    .map_err(|_| SyncError::InvalidToken)?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            url: format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                config.sync_path.trim_start_matches('/')
            ),
        })
    }

    async fn post(&self, request: SyncWindowRequest) -> Result<SyncWindowResponse, SyncError> {
        let resp = self.http.post(&self.url).json(&request).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(SyncWindowResponse::default());
        }
        let reply: SyncWindowResponse = serde_json::from_slice(&body)?;
        debug!(from = %request.from, to = %request.to, synced = reply.synced, "window synced");
        Ok(reply)
    }
}

impl SyncBackend for HttpSyncBackend {
    fn sync_window(&self, request: &SyncWindowRequest) -> SyncFuture<'_> {
        Box::pin(self.post(request.clone()))
    }
}
