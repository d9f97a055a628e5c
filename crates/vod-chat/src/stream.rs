//! # Chat stream
//!
//! Lazy, pull-driven production of VOD comments.
//!
//! A [`ChatStream`] owns a producer task that pages through the comment API
//! and hands chat comments to the consumer through a single-slot channel.
//! Every comment is sent in answer to a pull: the stream signals demand when
//! the consumer polls an empty channel, and the producer waits for that
//! signal before sending a comment or requesting a further page. A page
//! without chat comments keeps the demand, so the producer moves on to the
//! next page until it has something to deliver. At most one page request is
//! in flight at any time, which keeps comments in API order without sorting.
//!
//! The first page request is issued as soon as the stream is created.
//! Dropping or cancelling the stream stops the producer, abandoning any page
//! request in flight.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::{Notify, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::error::{ChatlogError, Result};
use crate::fetcher::PageFetcher;
use crate::model::{CommentPage, CommentRecord, FetchWindow, PagePosition};
use crate::progress::{NoopProgress, Progress, ProgressObserver};
use crate::vod_id::VodId;

/// Keep only regular chat comments, preserving their order.
pub fn filter_chat_comments(
    comments: impl IntoIterator<Item = CommentRecord>,
) -> Vec<CommentRecord> {
    comments.into_iter().filter(CommentRecord::is_chat).collect()
}

/// Lifecycle of a producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProducerPhase {
    /// First page requested, nothing buffered yet.
    Initializing,
    /// Waiting for the consumer to ask for more.
    Idle,
    /// One page request outstanding.
    Fetching,
    /// Handing buffered comments to the consumer.
    Draining,
    Completed,
    Failed,
}

impl ProducerPhase {
    fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug)]
struct ProducerState {
    phase: ProducerPhase,
    pending: VecDeque<CommentRecord>,
    cursor: Option<String>,
    elapsed_secs: i64,
    /// `created_at` of the last comment of the most recently drained page.
    last_emitted_at_ms: Option<i64>,
    /// A pull that has not been answered with a comment yet.
    demand: bool,
    pages: usize,
    delivered: usize,
}

impl ProducerState {
    fn new() -> Self {
        Self {
            phase: ProducerPhase::Initializing,
            pending: VecDeque::new(),
            cursor: None,
            elapsed_secs: 0,
            last_emitted_at_ms: None,
            demand: false,
            pages: 0,
            delivered: 0,
        }
    }
}

/// Outcome of waiting on the consumer.
enum Delivery {
    Ready,
    ConsumerGone,
}

struct Producer {
    vod_id: VodId,
    window: FetchWindow,
    fetcher: Arc<dyn PageFetcher>,
    observer: Arc<dyn ProgressObserver>,
    tx: mpsc::Sender<Result<CommentRecord>>,
    demand: Arc<Notify>,
    token: CancellationToken,
    state: ProducerState,
}

impl Producer {
    async fn run(mut self) {
        let mut position = PagePosition::Offset(self.window.start_offset_secs);

        loop {
            match self.fetch(position).await {
                Some(Ok(page)) => self.accept_page(page),
                Some(Err(err)) => return self.fail(err).await,
                None => return self.abandon(),
            }

            if let Delivery::ConsumerGone = self.drain().await {
                return self.abandon();
            }
            self.update_elapsed();

            let covered = self.state.elapsed_secs as f64 >= self.window.target_duration_secs;
            let cursor = match self.state.cursor.take() {
                Some(cursor) if !covered => cursor,
                _ => return self.complete(),
            };

            // the next page is only requested on behalf of a pull
            if let Delivery::ConsumerGone = self.await_demand().await {
                return self.abandon();
            }
            position = PagePosition::Cursor(cursor);
        }
    }

    /// Request one page. `None` means the consumer went away meanwhile.
    async fn fetch(&mut self, position: PagePosition) -> Option<Result<CommentPage>> {
        if self.state.phase != ProducerPhase::Initializing {
            self.state.phase = ProducerPhase::Fetching;
        }
        debug!(vod_id = %self.vod_id, %position, "Requesting comment page");

        let result = tokio::select! {
            biased;
            _ = self.token.cancelled() => return None,
            _ = self.tx.closed() => return None,
            result = self.fetcher.fetch_page(&self.vod_id, &position) => result,
        };

        Some(result.map_err(|err| {
            let missing = matches!(err, ChatlogError::PageFetch { .. }) && err.is_not_found();
            if missing && position.is_first_page() {
                info!(vod_id = %self.vod_id, "VOD has no recorded chat");
                ChatlogError::NoRecordedChat
            } else {
                err
            }
        }))
    }

    fn accept_page(&mut self, page: CommentPage) {
        let total = page.comments.len();
        let has_next = !page.is_last();
        let chat = filter_chat_comments(page.comments);
        debug!(
            vod_id = %self.vod_id,
            total,
            chat = chat.len(),
            has_next,
            "Buffered comment page"
        );

        self.state.pending = chat.into();
        self.state.cursor = page.next_cursor;
        self.state.pages += 1;
        self.state.phase = ProducerPhase::Idle;
        self.observer.on_page(&self.progress());
    }

    /// Wait until the consumer has asked for a comment that has not been
    /// sent yet.
    async fn await_demand(&mut self) -> Delivery {
        if self.state.demand {
            return Delivery::Ready;
        }
        let phase = std::mem::replace(&mut self.state.phase, ProducerPhase::Idle);

        let asked = tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            _ = self.tx.closed() => false,
            _ = self.demand.notified() => true,
        };
        if !asked {
            return Delivery::ConsumerGone;
        }
        self.state.demand = true;
        self.state.phase = phase;
        Delivery::Ready
    }

    /// Hand buffered comments over one pull at a time.
    async fn drain(&mut self) -> Delivery {
        self.state.phase = ProducerPhase::Draining;
        while !self.state.pending.is_empty() {
            if let Delivery::ConsumerGone = self.await_demand().await {
                return Delivery::ConsumerGone;
            }
            let permit = tokio::select! {
                biased;
                _ = self.token.cancelled() => return Delivery::ConsumerGone,
                permit = self.tx.reserve() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return Delivery::ConsumerGone,
                },
            };

            if let Some(comment) = self.state.pending.pop_front() {
                if self.state.pending.is_empty() {
                    self.state.last_emitted_at_ms = comment.created_at_ms();
                }
                permit.send(Ok(comment));
                self.state.demand = false;
                self.state.delivered += 1;
            }
        }
        self.state.phase = ProducerPhase::Idle;
        Delivery::Ready
    }

    fn update_elapsed(&mut self) {
        if let Some(created_at_ms) = self.state.last_emitted_at_ms {
            let elapsed = self.window.elapsed_secs(created_at_ms);
            self.state.elapsed_secs = self.state.elapsed_secs.max(elapsed);
        }
    }

    fn progress(&self) -> Progress {
        Progress {
            pages: self.state.pages,
            delivered: self.state.delivered,
            elapsed_secs: self.state.elapsed_secs,
            target_duration_secs: self.window.target_duration_secs,
        }
    }

    fn complete(mut self) {
        self.state.phase = ProducerPhase::Completed;
        debug!(
            vod_id = %self.vod_id,
            pages = self.state.pages,
            delivered = self.state.delivered,
            elapsed_secs = self.state.elapsed_secs,
            "Chat stream completed"
        );
        self.observer.on_finish(&self.progress());
        // dropping the sender ends the consumer's stream
    }

    async fn fail(mut self, err: ChatlogError) {
        self.state.phase = ProducerPhase::Failed;
        let discarded = self.state.pending.len();
        self.state.pending.clear();
        warn!(vod_id = %self.vod_id, discarded, error = %err, "Chat stream failed");

        tokio::select! {
            biased;
            _ = self.token.cancelled() => {}
            _ = self.tx.send(Err(err)) => {}
        }
    }

    fn abandon(mut self) {
        debug_assert!(!self.state.phase.is_terminal());
        self.state.phase = ProducerPhase::Completed;
        self.state.pending.clear();
        debug!(vod_id = %self.vod_id, "Chat stream abandoned by consumer");
    }
}

/// Demand-driven stream of chat comments of one VOD window.
///
/// Yields comments in API order. A failure is yielded once as an `Err` item,
/// after which the stream ends. Comments yielded before a failure stay
/// yielded.
pub struct ChatStream {
    inner: ReceiverStream<Result<CommentRecord>>,
    window: FetchWindow,
    demand: Arc<Notify>,
    /// Demand has been signalled and not answered yet.
    awaiting: bool,
    token: CancellationToken,
    _guard: DropGuard,
}

impl ChatStream {
    /// Start producing comments for `window`.
    ///
    /// Spawns the producer on the current tokio runtime and issues the first
    /// page request right away.
    pub fn spawn(vod_id: VodId, window: FetchWindow, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::spawn_with_observer(vod_id, window, fetcher, Arc::new(NoopProgress))
    }

    pub fn spawn_with_observer(
        vod_id: VodId,
        window: FetchWindow,
        fetcher: Arc<dyn PageFetcher>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let demand = Arc::new(Notify::new());

        let producer = Producer {
            vod_id,
            window,
            fetcher,
            observer,
            tx,
            demand: demand.clone(),
            token: token.clone(),
            state: ProducerState::new(),
        };
        tokio::spawn(producer.run());

        Self {
            inner: ReceiverStream::new(rx),
            window,
            demand,
            awaiting: false,
            _guard: token.clone().drop_guard(),
            token,
        }
    }

    pub fn window(&self) -> &FetchWindow {
        &self.window
    }

    /// Stop the producer. The stream yields nothing after this.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drain the whole stream into memory, failing on the first error.
    pub async fn collect_all(mut self) -> Result<Vec<CommentRecord>> {
        let mut comments = Vec::new();
        while let Some(comment) = self.next().await {
            comments.push(comment?);
        }
        if self.is_cancelled() {
            return Err(ChatlogError::Cancelled);
        }
        Ok(comments)
    }
}

impl Stream for ChatStream {
    type Item = Result<CommentRecord>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.token.is_cancelled() {
            return Poll::Ready(None);
        }
        match this.inner.poll_next_unpin(cx) {
            Poll::Pending => {
                if !this.awaiting {
                    this.awaiting = true;
                    this.demand.notify_one();
                }
                Poll::Pending
            }
            ready => {
                this.awaiting = false;
                ready
            }
        }
    }
}

impl std::fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStream")
            .field("window", &self.window)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
