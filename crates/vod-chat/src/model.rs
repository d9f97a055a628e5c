//! Data types shared by the resolver, the fetchers and the producer.

use std::fmt;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::{ChatlogError, Result};

/// Comment `source` value of regular chat messages.
pub const CHAT_SOURCE: &str = "chat";

/// Recording details of a VOD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VodMetadata {
    /// Wall-clock instant the recording started, in epoch milliseconds.
    pub recording_start_ms: i64,
    /// Total length of the recording in seconds.
    pub duration_secs: f64,
}

/// Raw VOD details as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct VodDetails {
    pub recorded_at: String,
    pub length: f64,
}

impl TryFrom<VodDetails> for VodMetadata {
    type Error = ChatlogError;

    fn try_from(details: VodDetails) -> Result<Self> {
        let recorded_at = DateTime::parse_from_rfc3339(&details.recorded_at).map_err(|e| {
            ChatlogError::invalid_response(format!(
                "unreadable recorded_at `{}`: {e}",
                details.recorded_at
            ))
        })?;
        Ok(Self {
            recording_start_ms: recorded_at.timestamp_millis(),
            duration_secs: details.length,
        })
    }
}

/// The part of a VOD a single producer run covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchWindow {
    /// Content offset of the first page request.
    pub start_offset_secs: u64,
    /// Playback coverage after which pagination stops.
    pub target_duration_secs: f64,
    /// Instant that playback position `start_offset_secs` corresponds to.
    pub absolute_vod_start_ms: i64,
}

impl FetchWindow {
    /// Whole seconds of playback covered by a comment created at `created_at_ms`.
    pub fn elapsed_secs(&self, created_at_ms: i64) -> i64 {
        // integer division truncates toward zero
        (created_at_ms - self.absolute_vod_start_ms) / 1000
    }

    pub fn is_unbounded(&self) -> bool {
        self.target_duration_secs >= crate::window::UNBOUNDED_DURATION_SECS
    }
}

/// Where a page request starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PagePosition {
    /// Seconds into the VOD, used for the first page.
    Offset(u64),
    /// Continuation token returned with the previous page.
    Cursor(String),
}

impl PagePosition {
    pub fn is_first_page(&self) -> bool {
        matches!(self, Self::Offset(_))
    }

    /// Query parameter selecting this position on the comments endpoint.
    pub fn query_pair(&self) -> (&'static str, String) {
        match self {
            Self::Offset(secs) => ("content_offset_seconds", secs.to_string()),
            Self::Cursor(cursor) => ("cursor", cursor.clone()),
        }
    }
}

impl fmt::Display for PagePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offset(secs) => write!(f, "offset {secs}"),
            Self::Cursor(cursor) => write!(f, "cursor {cursor}"),
        }
    }
}

/// A single comment, passed through untouched.
///
/// Only `source` and `created_at` are interpreted; everything else is left to
/// the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentRecord(serde_json::Value);

impl CommentRecord {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn source(&self) -> Option<&str> {
        self.0.get("source").and_then(|v| v.as_str())
    }

    pub fn created_at(&self) -> Option<&str> {
        self.0.get("created_at").and_then(|v| v.as_str())
    }

    /// `created_at` in epoch milliseconds.
    pub fn created_at_ms(&self) -> Option<i64> {
        self.created_at()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.timestamp_millis())
    }

    pub fn is_chat(&self) -> bool {
        self.source() == Some(CHAT_SOURCE)
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for CommentRecord {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// One page of comments.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommentPage {
    #[serde(default)]
    pub comments: Vec<CommentRecord>,
    /// Cursor of the following page; absent on the last page.
    #[serde(rename = "_next", default)]
    pub next_cursor: Option<String>,
}

impl CommentPage {
    pub fn new(comments: Vec<CommentRecord>, next_cursor: Option<String>) -> Self {
        Self {
            comments,
            next_cursor,
        }
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}
