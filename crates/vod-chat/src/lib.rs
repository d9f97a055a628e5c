//! # vod-chat
//!
//! Incremental retrieval of the chat replay of recorded Twitch VODs.
//!
//! A request names a VOD and optionally a time window, given either as
//! `HH:MM[:SS]` offsets into the recording or as absolute date-times. The
//! window is resolved against the VOD's recording details and the comments
//! are then streamed page by page as the consumer pulls them.
//!
//! ```no_run
//! use futures::StreamExt;
//! use vod_chat::{ChatlogRequest, get_chatlog};
//!
//! # async fn run() -> vod_chat::Result<()> {
//! let request = ChatlogRequest::new("79240813")
//!     .with_client_id("my-client-id")
//!     .with_start("00:05:00")
//!     .with_length(120);
//!
//! let mut chat = get_chatlog(&request).await?;
//! while let Some(comment) = chat.next().await {
//!     let comment = comment?;
//!     println!("{:?}", comment.created_at());
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod chatlog;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod progress;
pub mod stream;
pub mod vod_id;
pub mod window;

#[cfg(test)]
mod test_utils;

pub use api::TwitchApiClient;
pub use chatlog::{ChatlogClient, ChatlogRequest, get_chatlog};
pub use config::ApiConfig;
pub use error::{ChatlogError, Result};
pub use fetcher::{MetadataFetcher, PageFetcher};
pub use model::{CommentPage, CommentRecord, FetchWindow, PagePosition, VodMetadata};
pub use progress::{NoopProgress, Progress, ProgressObserver, TracingProgress};
pub use stream::{ChatStream, filter_chat_comments};
pub use vod_id::VodId;
pub use window::{TimeBounds, UNBOUNDED_DURATION_SECS, resolve as resolve_window};
