//! Chat log error types.

use reqwest::StatusCode;
use thiserror::Error;

use crate::model::PagePosition;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, ChatlogError>;

/// Errors that can occur while resolving or streaming a VOD chat log.
#[derive(Error, Debug)]
pub enum ChatlogError {
    /// The VOD identifier is not a plain run of digits.
    #[error("invalid VOD ID `{input}`: the ID must have the format of 123456789")]
    InvalidIdentifier { input: String },

    /// A start or end time could not be read.
    #[error("could not read the {name} time `{value}`")]
    InvalidTimeFormat { name: &'static str, value: String },

    /// The VOD details request returned a non-success status.
    #[error("could not load VOD details: HTTP {status}")]
    MetadataFetch { status: StatusCode, message: String },

    /// A comment page request returned a non-success status.
    #[error("could not load fragment at {position}: HTTP {status}")]
    PageFetch {
        status: StatusCode,
        position: PagePosition,
    },

    /// The very first page was not found, so the VOD has no chat replay.
    #[error("this video has no recorded chat")]
    NoRecordedChat,

    /// Transport-level failure before a status was received.
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The API answered with a body we could not make sense of.
    #[error("invalid API response: {reason}")]
    InvalidResponse { reason: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// The consumer cancelled the sequence.
    #[error("chat log retrieval cancelled")]
    Cancelled,
}

impl ChatlogError {
    pub fn invalid_identifier(input: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            input: input.into(),
        }
    }

    pub fn invalid_time(name: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidTimeFormat {
            name,
            value: value.into(),
        }
    }

    pub fn metadata_fetch(status: StatusCode, message: impl Into<String>) -> Self {
        Self::MetadataFetch {
            status,
            message: message.into(),
        }
    }

    pub fn page_fetch(status: StatusCode, position: PagePosition) -> Self {
        Self::PageFetch { status, position }
    }

    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// HTTP status of the response that caused this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::MetadataFetch { status, .. } | Self::PageFetch { status, .. } => Some(*status),
            Self::NoRecordedChat => Some(StatusCode::NOT_FOUND),
            Self::Network(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Whether the error was raised before any network request was made.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifier { .. } | Self::InvalidTimeFormat { .. }
        )
    }
}
