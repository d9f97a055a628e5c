//! Time window resolution.
//!
//! Turns user-supplied start/end/length values into a [`FetchWindow`]. Start
//! and end accept either a short time of day (`HH:MM`, `HH:MM:SS` or
//! `HH:MM.SS`), read as an offset into the VOD, or an absolute date-time.
//!
//! Whether a parsed instant is an offset or an absolute wall-clock time is
//! decided against the recording start of the VOD: anything earlier than the
//! recording start is treated as an offset.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;
use tracing::debug;

use crate::error::{ChatlogError, Result};
use crate::model::{FetchWindow, VodMetadata};

/// Target duration used when neither an end nor a length is requested.
pub const UNBOUNDED_DURATION_SECS: f64 = 9_007_199_254_740_991.0;

const MS_PER_SEC: i64 = 1000;

static SHORT_TIME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{2}):([0-9]{2})(?:[.:]([0-9]{2}))?$").unwrap());

/// Trailing `(Zone Name)` of JavaScript `Date#toString` output.
static ZONE_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\([^)]*\)$").unwrap());

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%a %b %d %Y %H:%M:%S GMT%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a start or end time into epoch milliseconds.
///
/// Short times are placed on 1970-01-01 UTC, so they come out as a plain
/// millisecond offset. `name` only feeds the error message.
pub fn parse_time(raw: &str, name: &'static str) -> Result<i64> {
    let raw = raw.trim();
    let timestamp = match SHORT_TIME_REGEX.captures(raw) {
        Some(caps) => {
            let field = |i: usize| {
                caps.get(i)
                    .map_or(Some(0), |m| m.as_str().parse::<u32>().ok())
            };
            let time = match (field(1), field(2), field(3)) {
                (Some(h), Some(m), Some(s)) => NaiveTime::from_hms_opt(h, m, s),
                _ => None,
            };
            time.map(|t| i64::from(t.num_seconds_from_midnight()) * MS_PER_SEC)
        }
        None => parse_absolute(raw),
    };

    match timestamp {
        Some(ts) if ts >= 0 => Ok(ts),
        _ => Err(ChatlogError::invalid_time(name, raw)),
    }
}

fn parse_absolute(raw: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.timestamp_millis());
    }

    let stripped = ZONE_NAME_REGEX.replace(raw, "");
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&stripped, format) {
            return Some(dt.timestamp_millis());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Parsed but not yet resolved window bounds.
///
/// Parsing happens before any network request so that malformed input fails
/// fast; resolution needs the VOD metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeBounds {
    pub start_ms: i64,
    pub end_ms: Option<i64>,
    /// Requested length in seconds. `None` and `Some(0)` both mean the whole log.
    pub length_secs: Option<u64>,
}

impl TimeBounds {
    pub fn parse(start: Option<&str>, end: Option<&str>, length_secs: Option<u64>) -> Result<Self> {
        let start_ms = match start {
            Some(raw) if !raw.is_empty() => parse_time(raw, "start")?,
            _ => 0,
        };
        let end_ms = match end {
            Some(raw) if !raw.is_empty() => Some(parse_time(raw, "end")?),
            _ => None,
        };
        Ok(Self {
            start_ms,
            end_ms,
            length_secs,
        })
    }

    pub fn resolve(&self, meta: &VodMetadata) -> FetchWindow {
        let recording_start = meta.recording_start_ms;

        let start_rel_ms = relative_to_recording(self.start_ms, recording_start);
        let start_secs = start_rel_ms as f64 / MS_PER_SEC as f64;

        let mut requested = match self.length_secs {
            Some(secs) if secs > 0 => secs as f64,
            _ => UNBOUNDED_DURATION_SECS,
        };

        if let Some(end_ms) = self.end_ms {
            let span_ms = if end_ms < recording_start {
                end_ms - start_rel_ms
            } else {
                end_ms - recording_start - start_rel_ms
            };
            requested = (span_ms / MS_PER_SEC) as f64;
        }

        let remaining = meta.duration_secs - start_secs;
        let target_duration_secs = requested.min(remaining).max(0.0);

        let window = FetchWindow {
            start_offset_secs: (start_rel_ms / MS_PER_SEC) as u64,
            target_duration_secs,
            absolute_vod_start_ms: recording_start + start_rel_ms,
        };
        debug!(
            start_offset_secs = window.start_offset_secs,
            target_duration_secs = window.target_duration_secs,
            "Resolved fetch window"
        );
        window
    }
}

/// Milliseconds into the recording for a parsed start value.
fn relative_to_recording(instant_ms: i64, recording_start_ms: i64) -> i64 {
    if recording_start_ms > instant_ms {
        instant_ms
    } else {
        instant_ms - recording_start_ms
    }
}

/// Resolve raw window parameters against VOD metadata.
pub fn resolve(
    raw_start: Option<&str>,
    raw_end: Option<&str>,
    raw_length: Option<u64>,
    meta: &VodMetadata,
) -> Result<FetchWindow> {
    Ok(TimeBounds::parse(raw_start, raw_end, raw_length)?.resolve(meta))
}
