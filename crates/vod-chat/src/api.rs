//! HTTP implementation of the fetcher traits for the kraken v5 API.

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, instrument, warn};

use crate::config::{ApiConfig, create_client};
use crate::error::{ChatlogError, Result};
use crate::fetcher::{MetadataFetcher, PageFetcher};
use crate::model::{CommentPage, PagePosition, VodDetails, VodMetadata};
use crate::vod_id::VodId;

/// Client for the VOD details and VOD comments endpoints.
#[derive(Debug, Clone)]
pub struct TwitchApiClient {
    client: Client,
    config: ApiConfig,
}

impl TwitchApiClient {
    pub fn new() -> Result<Self> {
        Self::with_config(ApiConfig::default())
    }

    pub fn with_config(config: ApiConfig) -> Result<Self> {
        let client = create_client(&config)?;
        Ok(Self { client, config })
    }

    /// Use an already built client. The client credential from `config` is
    /// still attached to every request.
    pub fn with_client(client: Client, config: ApiConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn videos_url(&self, vod_id: &VodId) -> String {
        format!("{}/kraken/videos/{}", self.config.base_url, vod_id)
    }

    async fn send_get(&self, url: &str, query: &[(&str, String)]) -> Result<Response> {
        let response = self
            .client
            .get(url)
            .headers(self.config.request_headers()?)
            .query(query)
            .send()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl MetadataFetcher for TwitchApiClient {
    #[instrument(skip(self), level = "debug")]
    async fn fetch_vod_metadata(&self, vod_id: &VodId) -> Result<VodMetadata> {
        let url = self.videos_url(vod_id);
        let response = self.send_get(&url, &[]).await?;

        let status = response.status();
        if !status.is_success() {
            warn!(vod_id = %vod_id, %status, "Could not load VOD details");
            return Err(ChatlogError::metadata_fetch(
                status,
                status.canonical_reason().unwrap_or("unknown status"),
            ));
        }

        let body = response.text().await?;
        let details: VodDetails = serde_json::from_str(&body).map_err(|e| {
            ChatlogError::invalid_response(format!("malformed VOD details: {e}"))
        })?;
        let meta = VodMetadata::try_from(details)?;
        debug!(
            vod_id = %vod_id,
            recording_start_ms = meta.recording_start_ms,
            duration_secs = meta.duration_secs,
            "Loaded VOD details"
        );
        Ok(meta)
    }
}

#[async_trait]
impl PageFetcher for TwitchApiClient {
    #[instrument(skip(self), level = "debug")]
    async fn fetch_page(&self, vod_id: &VodId, position: &PagePosition) -> Result<CommentPage> {
        let url = format!("{}/comments", self.videos_url(vod_id));
        let response = self.send_get(&url, &[position.query_pair()]).await?;

        let status = response.status();
        if !status.is_success() {
            warn!(vod_id = %vod_id, %position, %status, "Could not load comment fragment");
            return Err(ChatlogError::page_fetch(status, position.clone()));
        }

        let body = response.text().await?;
        let page: CommentPage = serde_json::from_str(&body)?;
        debug!(
            vod_id = %vod_id,
            comments = page.comments.len(),
            has_next = page.next_cursor.is_some(),
            "Loaded comment fragment"
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{init_tracing, plain_http_client};
    use mockito::Matcher;
    use reqwest::StatusCode;
    use serde_json::json;

    fn api(server: &mockito::Server) -> TwitchApiClient {
        let config = ApiConfig::default()
            .with_base_url(server.url())
            .with_client_id("test-client");
        TwitchApiClient::with_client(plain_http_client(), config)
    }

    #[tokio::test]
    async fn test_fetch_vod_metadata() {
        init_tracing();
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/kraken/videos/79240813")
            .match_header("client-id", "test-client")
            .match_header("accept", "application/vnd.twitchtv.v5+json")
            .with_header("content-type", "application/json")
            .with_body(
                json!({"_id": "v79240813", "recorded_at": "2016-07-09T16:00:00Z", "length": 200})
                    .to_string(),
            )
            .create_async()
            .await;

        let meta = api(&server)
            .fetch_vod_metadata(&VodId::parse("79240813").unwrap())
            .await
            .unwrap();
        assert_eq!(meta.recording_start_ms, 1_468_080_000_000);
        assert_eq!(meta.duration_secs, 200.0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_vod_metadata_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/kraken/videos/1")
            .with_status(404)
            .create_async()
            .await;

        let err = api(&server)
            .fetch_vod_metadata(&VodId::from(1u64))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatlogError::MetadataFetch { .. }));
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_fetch_vod_metadata_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/kraken/videos/1")
            .with_body(json!({"length": 10}).to_string())
            .create_async()
            .await;

        let err = api(&server)
            .fetch_vod_metadata(&VodId::from(1u64))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatlogError::InvalidResponse { .. }));
        assert!(err.to_string().contains("recorded_at"), "{err}");
    }

    #[tokio::test]
    async fn test_fetch_vod_metadata_bad_timestamp() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/kraken/videos/1")
            .with_body(json!({"recorded_at": "last tuesday", "length": 10}).to_string())
            .create_async()
            .await;

        let err = api(&server)
            .fetch_vod_metadata(&VodId::from(1u64))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatlogError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_fetch_page_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/kraken/videos/1/comments")
            .match_query(Matcher::Any)
            .with_body("<html>rate limited</html>")
            .create_async()
            .await;

        let err = api(&server)
            .fetch_page(&VodId::from(1u64), &PagePosition::Offset(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatlogError::Json(_)));
    }

    #[tokio::test]
    async fn test_fetch_first_page_by_offset() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/kraken/videos/1/comments")
            .match_query(Matcher::UrlEncoded(
                "content_offset_seconds".into(),
                "60".into(),
            ))
            .with_body(
                json!({
                    "comments": [{"source": "chat", "created_at": "2016-07-09T16:01:05Z"}],
                    "_next": "cursor-2"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let page = api(&server)
            .fetch_page(&VodId::from(1u64), &PagePosition::Offset(60))
            .await
            .unwrap();
        assert_eq!(page.comments.len(), 1);
        assert_eq!(page.next_cursor.as_deref(), Some("cursor-2"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_page_by_cursor() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/kraken/videos/1/comments")
            .match_query(Matcher::UrlEncoded("cursor".into(), "abc=".into()))
            .with_body(json!({"comments": []}).to_string())
            .create_async()
            .await;

        let page = api(&server)
            .fetch_page(&VodId::from(1u64), &PagePosition::Cursor("abc=".into()))
            .await
            .unwrap();
        assert!(page.comments.is_empty());
        assert!(page.is_last());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_page_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/kraken/videos/1/comments")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let err = api(&server)
            .fetch_page(&VodId::from(1u64), &PagePosition::Cursor("c".into()))
            .await
            .unwrap_err();
        match err {
            ChatlogError::PageFetch { status, position } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(position, PagePosition::Cursor("c".into()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
