//! Batch Coordinator: sequential per-page extraction with periodic flush.
//!
//! This is the heart of the crate. Pages are processed strictly in ascending
//! position order, one model call at a time — the endpoint is treated as an
//! exclusive, rate-limited resource, and serial dispatch is what keeps memory
//! bounded and output order trivial to reason about.
//!
//! State machine per run:
//!
//! ```text
//! Idle → Processing(i) → { Flushing | Processing(i+1) } → Done
//! ```
//!
//! Successful markdown accumulates (blank-line separated) in page order;
//! failed pages are logged, counted, and skipped — never reordered, never
//! retried. Every `flush_every` pages the non-empty accumulator is appended
//! to the report sink and cleared, bounding memory across very large batches
//! and leaving partial output on disk if the process dies later. The
//! remainder after the last page is flushed as well, subject only to the
//! non-empty check (appending nothing is not a flush).
//!
//! Only two things abort a run mid-batch: the sink refusing a write (the
//! report is the only product) and process termination. There is no
//! cancellation token; a future revision could check one between pages.

use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::model::VisionModel;
use crate::output::PageResult;
use crate::pipeline::{extract, source::PageImage};
use crate::progress::{BatchObserver, BatchProgress};
use crate::report::ReportSink;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

/// What one coordinator run produced: per-page results in page order plus
/// the final progress snapshot and flush count.
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: Vec<PageResult>,
    pub progress: BatchProgress,
    /// Durable appends performed on the sink.
    pub flushes: usize,
}

/// Process `pages` in order, accumulating and periodically flushing output.
///
/// The injection seam of the crate: tests and embedders supply their own
/// [`VisionModel`], [`ReportSink`], and [`BatchObserver`]; [`crate::run`]
/// wires up the production implementations.
///
/// # Errors
/// Only [`BatchError::OutputWriteFailed`] is possible here — every page-level
/// failure is recovered locally and recorded in the returned results.
pub async fn run_pages(
    pages: &[PageImage],
    model: &Arc<dyn VisionModel>,
    config: &BatchConfig,
    sink: &mut dyn ReportSink,
    observer: &Arc<dyn BatchObserver>,
) -> Result<BatchOutcome, BatchError> {
    let total = pages.len();
    let mut progress = BatchProgress::new(total);
    let mut results: Vec<PageResult> = Vec::with_capacity(total);

    // The builder validates this, but the field is pub; guard the modulo.
    let flush_every = config.flush_every.max(1);

    let mut accumulated = String::new();
    let mut pages_in_accumulator = 0usize;
    let mut flushes = 0usize;

    observer.on_batch_start(total);
    info!("Batch start: {} pages, flush every {}", total, flush_every);

    for (i, page) in pages.iter().enumerate() {
        observer.on_page_start(page.position, total);

        let result = extract::extract(page, model, config).await;

        match &result.error {
            None => {
                accumulated.push_str(&result.markdown);
                accumulated.push_str("\n\n");
                pages_in_accumulator += 1;
                progress.record_page(false, result.duration_ms);
                info!(
                    "Processed page {}/{} in {}ms ({})",
                    page.position,
                    total,
                    result.duration_ms,
                    page.path.display()
                );
                observer.on_page_complete(page.position, &progress, result.markdown.len());
            }
            Some(error) => {
                progress.record_page(true, result.duration_ms);
                warn!("{error}");
                observer.on_page_error(page.position, &progress, &error.to_string());
            }
        }

        results.push(result);

        // Periodic flush: every N pages, non-empty accumulator only.
        if (i + 1) % flush_every == 0 && !accumulated.is_empty() {
            sink.append(&accumulated).await?;
            observer.on_flush(pages_in_accumulator, accumulated.len());
            flushes += 1;
            info!(
                "Flushed {} pages ({} bytes) after page {}",
                pages_in_accumulator,
                accumulated.len(),
                i + 1
            );
            accumulated.clear();
            pages_in_accumulator = 0;
        }

        // Load-smoothing pause between pages; nothing to smooth after the last.
        if config.page_delay_ms > 0 && i + 1 < total {
            sleep(Duration::from_millis(config.page_delay_ms)).await;
        }
    }

    // Final flush: the every-N condition no longer applies, only non-emptiness.
    if !accumulated.is_empty() {
        sink.append(&accumulated).await?;
        observer.on_flush(pages_in_accumulator, accumulated.len());
        flushes += 1;
        info!(
            "Final flush: {} pages ({} bytes)",
            pages_in_accumulator,
            accumulated.len()
        );
    }

    observer.on_batch_complete(&progress);
    info!(
        "Batch done: {}/{} pages succeeded, {} failed, {} flushes",
        progress.processed - progress.failed,
        total,
        progress.failed,
        flushes
    );

    Ok(BatchOutcome {
        results,
        progress,
        flushes,
    })
}
