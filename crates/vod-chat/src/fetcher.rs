//! Collaborator interfaces the producer pulls data through.
//!
//! [`crate::api::TwitchApiClient`] implements both against the HTTP API; tests
//! plug in scripted implementations.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{CommentPage, PagePosition, VodMetadata};
use crate::vod_id::VodId;

/// Source of VOD recording details.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetch recording start and length of a VOD.
    ///
    /// Non-success responses fail with
    /// [`ChatlogError::MetadataFetch`](crate::ChatlogError::MetadataFetch);
    /// no retry happens at this layer.
    async fn fetch_vod_metadata(&self, vod_id: &VodId) -> Result<VodMetadata>;
}

/// Source of comment pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page of comments.
    ///
    /// Non-success responses fail with
    /// [`ChatlogError::PageFetch`](crate::ChatlogError::PageFetch) carrying the
    /// status, so the caller can tell a missing chat replay apart from other
    /// failures.
    async fn fetch_page(&self, vod_id: &VodId, position: &PagePosition) -> Result<CommentPage>;
}
