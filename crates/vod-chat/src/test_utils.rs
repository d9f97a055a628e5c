use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use reqwest::StatusCode;
use serde_json::json;

use crate::error::{ChatlogError, Result};
use crate::fetcher::{MetadataFetcher, PageFetcher};
use crate::model::{CommentPage, CommentRecord, FetchWindow, PagePosition, VodMetadata};
use crate::vod_id::VodId;

/// 2016-07-09T16:00:00Z
pub const RECORDED_AT_MS: i64 = 1_468_080_000_000;

/// Initialize tracing for tests with appropriate settings
#[inline]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Client for talking plain HTTP to a local mock server.
pub fn plain_http_client() -> reqwest::Client {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let tls_config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(rustls::RootCertStore::empty())
        .with_no_client_auth();
    reqwest::Client::builder()
        .use_preconfigured_tls(tls_config)
        .build()
        .unwrap()
}

fn created_at(offset_secs: i64) -> String {
    DateTime::from_timestamp_millis(RECORDED_AT_MS + offset_secs * 1000)
        .unwrap()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Chat comment posted `offset_secs` into the recording.
pub fn chat_comment(offset_secs: i64, body: &str) -> CommentRecord {
    CommentRecord::new(json!({
        "_id": format!("chat-{offset_secs}-{body}"),
        "created_at": created_at(offset_secs),
        "content_offset_seconds": offset_secs,
        "source": "chat",
        "commenter": {"display_name": "viewer", "name": "viewer"},
        "message": {"body": body, "is_action": false},
    }))
}

/// Non-chat entry, e.g. a subscription notice.
pub fn system_comment(offset_secs: i64) -> CommentRecord {
    CommentRecord::new(json!({
        "_id": format!("system-{offset_secs}"),
        "created_at": created_at(offset_secs),
        "source": "system",
        "message": {"body": "someone subscribed"},
    }))
}

pub fn metadata(duration_secs: f64) -> VodMetadata {
    VodMetadata {
        recording_start_ms: RECORDED_AT_MS,
        duration_secs,
    }
}

pub fn window_from_start(start_offset_secs: u64, target_duration_secs: f64) -> FetchWindow {
    FetchWindow {
        start_offset_secs,
        target_duration_secs,
        absolute_vod_start_ms: RECORDED_AT_MS + start_offset_secs as i64 * 1000,
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Page(CommentPage),
    Status(StatusCode),
}

/// Fetcher answering from a fixed script and recording every request.
#[derive(Debug, Default)]
pub struct ScriptedPageFetcher {
    responses: HashMap<PagePosition, Scripted>,
    metadata: Option<VodMetadata>,
    latency: Duration,
    calls: Mutex<Vec<PagePosition>>,
    metadata_calls: Mutex<usize>,
}

impl ScriptedPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(
        mut self,
        position: PagePosition,
        comments: Vec<CommentRecord>,
        next: Option<&str>,
    ) -> Self {
        let page = CommentPage::new(comments, next.map(str::to_owned));
        self.responses.insert(position, Scripted::Page(page));
        self
    }

    pub fn status(mut self, position: PagePosition, status: StatusCode) -> Self {
        self.responses.insert(position, Scripted::Status(status));
        self
    }

    pub fn with_metadata(mut self, metadata: VodMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<PagePosition> {
        self.calls.lock().unwrap().clone()
    }

    pub fn metadata_calls(&self) -> usize {
        *self.metadata_calls.lock().unwrap()
    }
}

#[async_trait]
impl PageFetcher for ScriptedPageFetcher {
    async fn fetch_page(&self, _vod_id: &VodId, position: &PagePosition) -> Result<CommentPage> {
        self.calls.lock().unwrap().push(position.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.responses.get(position) {
            Some(Scripted::Page(page)) => Ok(page.clone()),
            Some(Scripted::Status(status)) => {
                Err(ChatlogError::page_fetch(*status, position.clone()))
            }
            None => Err(ChatlogError::page_fetch(
                StatusCode::NOT_FOUND,
                position.clone(),
            )),
        }
    }
}

#[async_trait]
impl MetadataFetcher for ScriptedPageFetcher {
    async fn fetch_vod_metadata(&self, _vod_id: &VodId) -> Result<VodMetadata> {
        *self.metadata_calls.lock().unwrap() += 1;
        self.metadata
            .ok_or_else(|| ChatlogError::metadata_fetch(StatusCode::NOT_FOUND, "Not Found"))
    }
}
