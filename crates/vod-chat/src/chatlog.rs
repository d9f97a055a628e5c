//! Entry point tying validation, window resolution and the producer together.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::api::TwitchApiClient;
use crate::config::ApiConfig;
use crate::error::Result;
use crate::fetcher::{MetadataFetcher, PageFetcher};
use crate::progress::{NoopProgress, ProgressObserver};
use crate::stream::ChatStream;
use crate::vod_id::VodId;
use crate::window::TimeBounds;

/// What part of which VOD to fetch the chat log of.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatlogRequest {
    /// ID of the VOD, digits only, without the leading `v`.
    pub vod_id: String,
    /// Client credential, only consulted by [`get_chatlog`].
    pub client_id: Option<String>,
    /// Short time (`HH:MM[:SS]`) into the VOD or absolute date-time.
    pub start: Option<String>,
    /// Same forms as `start`. Overrides `length_secs`.
    pub end: Option<String>,
    /// Seconds of chat to fetch; `None` or zero fetches the whole log.
    pub length_secs: Option<u64>,
}

impl ChatlogRequest {
    pub fn new(vod_id: impl Into<String>) -> Self {
        Self {
            vod_id: vod_id.into(),
            ..Default::default()
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn with_length(mut self, length_secs: u64) -> Self {
        self.length_secs = Some(length_secs);
        self
    }
}

/// Resolves requests into [`ChatStream`]s.
#[derive(Clone)]
pub struct ChatlogClient {
    metadata: Arc<dyn MetadataFetcher>,
    pages: Arc<dyn PageFetcher>,
    observer: Arc<dyn ProgressObserver>,
}

impl ChatlogClient {
    /// Client backed by the HTTP API.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let api = Arc::new(TwitchApiClient::with_config(config)?);
        Ok(Self::with_fetchers(api.clone(), api))
    }

    pub fn with_fetchers(metadata: Arc<dyn MetadataFetcher>, pages: Arc<dyn PageFetcher>) -> Self {
        Self {
            metadata,
            pages,
            observer: Arc::new(NoopProgress),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Validate the request, look up the VOD and start streaming its chat.
    ///
    /// Malformed IDs and times fail before any request is made. The returned
    /// stream has already issued its first page request.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_chatlog(&self, request: &ChatlogRequest) -> Result<ChatStream> {
        let vod_id = VodId::parse(&request.vod_id)?;
        let bounds = TimeBounds::parse(
            request.start.as_deref(),
            request.end.as_deref(),
            request.length_secs,
        )?;

        let meta = self.metadata.fetch_vod_metadata(&vod_id).await?;
        let window = bounds.resolve(&meta);
        info!(
            vod_id = %vod_id,
            start_offset_secs = window.start_offset_secs,
            target_duration_secs = window.target_duration_secs,
            unbounded = window.is_unbounded(),
            "Fetching chat log"
        );

        Ok(ChatStream::spawn_with_observer(
            vod_id,
            window,
            self.pages.clone(),
            self.observer.clone(),
        ))
    }
}

/// Fetch the chat log of a VOD using the HTTP API.
///
/// Configuration comes from [`ApiConfig::from_env`]; a client ID on the
/// request takes precedence over the environment.
pub async fn get_chatlog(request: &ChatlogRequest) -> Result<ChatStream> {
    let mut config = ApiConfig::from_env();
    if let Some(client_id) = &request.client_id {
        config = config.with_client_id(client_id.clone());
    }
    ChatlogClient::new(config)?.get_chatlog(request).await
}
