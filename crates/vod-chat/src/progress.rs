//! Progress reporting hook for chat log retrieval.

use tracing::info;

/// Snapshot of how far a producer has come.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Pages fetched so far, including the first one.
    pub pages: usize,
    /// Comments handed to the consumer so far.
    pub delivered: usize,
    /// Playback seconds covered by the comments delivered before this page.
    pub elapsed_secs: i64,
    pub target_duration_secs: f64,
}

impl Progress {
    /// Fraction of the target duration covered, `None` for an unbounded window.
    pub fn ratio(&self) -> Option<f64> {
        if self.target_duration_secs <= 0.0
            || self.target_duration_secs >= crate::window::UNBOUNDED_DURATION_SECS
        {
            return None;
        }
        Some((self.elapsed_secs.max(0) as f64 / self.target_duration_secs).min(1.0))
    }
}

/// Observer notified by the producer as pages arrive.
///
/// Callbacks run on the producer task and must not block.
pub trait ProgressObserver: Send + Sync {
    fn on_page(&self, _progress: &Progress) {}

    fn on_finish(&self, _progress: &Progress) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {}

/// Observer that logs progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressObserver for TracingProgress {
    fn on_page(&self, progress: &Progress) {
        match progress.ratio() {
            Some(ratio) => info!(
                pages = progress.pages,
                elapsed_secs = progress.elapsed_secs,
                "Chat log {:.1}% loaded",
                ratio * 100.0
            ),
            None => info!(
                pages = progress.pages,
                elapsed_secs = progress.elapsed_secs,
                "Chat log loading"
            ),
        }
    }

    fn on_finish(&self, progress: &Progress) {
        info!(
            pages = progress.pages,
            delivered = progress.delivered,
            "Chat log complete"
        );
    }
}
