//! Result and accounting types produced by the pipeline.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of extracting one page.
///
/// A tagged result rather than a bare `Result`: a failed page still carries
/// its position and elapsed time so the coordinator can keep order-accurate
/// accounting without re-deriving anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed position in the batch.
    pub position: usize,
    /// Extracted Markdown. Empty when `error` is set.
    pub markdown: String,
    /// Wall-clock time spent on this page, including the model call.
    pub duration_ms: u64,
    /// Set when the page failed; `None` means `markdown` is the product.
    pub error: Option<PageError>,
}

impl PageResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Final accounting for one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Pages the Page Source produced.
    pub total_pages: usize,
    /// Pages that yielded Markdown.
    pub processed_pages: usize,
    /// Pages skipped after a per-page failure.
    pub failed_pages: usize,
    /// Documents that degraded to zero pages.
    pub skipped_documents: usize,
    /// Durable appends performed on the report sink.
    pub flushes: usize,
    /// End-to-end wall-clock time.
    pub total_duration_ms: u64,
    /// Time spent rasterising documents.
    pub render_duration_ms: u64,
    /// Time spent inside model calls (sum over pages).
    pub extract_duration_ms: u64,
}

/// What [`crate::run`] hands back: the accounting plus where the report
/// landed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub stats: BatchStats,
    /// `None` when zero pages produced content (no artifact is created).
    pub output_path: Option<PathBuf>,
}
