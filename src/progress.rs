//! Observer trait and progress snapshot for batch runs.
//!
//! Inject an `Arc<dyn BatchObserver>` via [`crate::run_with_observer`] to receive
//! events as the coordinator works through the batch. The observer is purely
//! observational: nothing it does feeds back into pipeline behaviour, so a
//! progress bar, a GUI, or a log forwarder can all sit behind the same seam
//! without affecting extraction correctness.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a WebSocket, or a terminal progress bar
//! without the library knowing how the host application communicates. The
//! pipeline is strictly sequential, so implementations never see concurrent
//! calls, but the trait is `Send + Sync` so observers can be shared across
//! tasks.

use serde::{Deserialize, Serialize};

/// Ephemeral progress state, owned and mutated only by the coordinator.
///
/// Read-only snapshots are handed to observers after every page; nothing is
/// persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Pages in the batch.
    pub total: usize,
    /// Pages attempted so far (success or failure).
    pub processed: usize,
    /// Pages that failed so far.
    pub failed: usize,
    /// Wall-clock time spent on the most recent page, in milliseconds.
    pub last_page_ms: u64,
    /// Cumulative wall-clock time across attempted pages, in milliseconds.
    pub cumulative_ms: u64,
}

impl BatchProgress {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub(crate) fn record_page(&mut self, failed: bool, duration_ms: u64) {
        self.processed += 1;
        if failed {
            self.failed += 1;
        }
        self.last_page_ms = duration_ms;
        self.cumulative_ms += duration_ms;
    }

    /// Completion percentage in `[0, 100]`. Zero-page batches report 100.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.processed * 100) / self.total) as u8
    }
}

/// Called by the coordinator as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait BatchObserver: Send + Sync {
    /// Called once before the first page, with the batch size.
    fn on_batch_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page's model call.
    fn on_page_start(&self, position: usize, total_pages: usize) {
        let _ = (position, total_pages);
    }

    /// Called when a page yielded Markdown.
    fn on_page_complete(&self, position: usize, progress: &BatchProgress, markdown_len: usize) {
        let _ = (position, progress, markdown_len);
    }

    /// Called when a page failed and was skipped.
    fn on_page_error(&self, position: usize, progress: &BatchProgress, error: &str) {
        let _ = (position, progress, error);
    }

    /// Called after each durable append to the report sink.
    fn on_flush(&self, pages_flushed: usize, bytes: usize) {
        let _ = (pages_flushed, bytes);
    }

    /// Called once after the last page, regardless of how many failed.
    fn on_batch_complete(&self, progress: &BatchProgress) {
        let _ = progress;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}
