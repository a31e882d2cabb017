//! Top-level entry points: scan a source directory, extract, write the
//! report.
//!
//! [`run`] is the zero-ceremony path — Ollama client, timestamped file
//! report, no observer. [`run_with_observer`] accepts an injected model
//! handle and observer for CLIs, GUIs, and tests; for full sink control
//! (e.g. an in-memory report) drop down to [`crate::batch::run_pages`].

use crate::batch;
use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::model::{OllamaClient, VisionModel};
use crate::output::{BatchStats, BatchSummary};
use crate::pipeline::source;
use crate::progress::{BatchObserver, NoopObserver};
use crate::report::FileReport;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Convert every PDF and page image under `source_dir` into one Markdown
/// report.
///
/// # Returns
/// `Ok(BatchSummary)` on a completed run, even if some pages failed (check
/// `summary.stats.failed_pages`). `summary.output_path` is `None` when no
/// page produced content — no artifact is created for an empty result.
///
/// # Errors
/// Fatal only: source directory unavailable, report unwritable, corrupt
/// document under the abort policy.
pub async fn run(
    source_dir: impl AsRef<Path>,
    config: &BatchConfig,
) -> Result<BatchSummary, BatchError> {
    let model: Arc<dyn VisionModel> = Arc::new(
        OllamaClient::new(&config.endpoint, config.api_timeout_secs)
            .map_err(|e| BatchError::Internal(format!("model client: {e}")))?,
    );
    run_with_observer(source_dir, config, model, Arc::new(NoopObserver)).await
}

/// [`run`] with an injected model handle and progress observer.
pub async fn run_with_observer(
    source_dir: impl AsRef<Path>,
    config: &BatchConfig,
    model: Arc<dyn VisionModel>,
    observer: Arc<dyn BatchObserver>,
) -> Result<BatchSummary, BatchError> {
    let total_start = Instant::now();
    let source_dir = source_dir.as_ref();
    info!("Starting batch extraction: {}", source_dir.display());

    // ── Step 1: Scan the source directory ────────────────────────────────
    let documents = source::list_documents(source_dir)?;
    info!("Found {} documents", documents.len());

    // ── Step 2: Rasterise into a scratch directory ───────────────────────
    // The TempDir lives until this function returns; every scratch PNG is
    // gone by then, success or failure.
    let scratch = tempfile::TempDir::new()
        .map_err(|e| BatchError::Internal(format!("scratch dir: {e}")))?;

    let render_start = Instant::now();
    let (pages, skipped_documents) =
        source::collect_pages(&documents, config, scratch.path()).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(
        "Rasterised {} pages in {}ms ({} documents skipped)",
        pages.len(),
        render_duration_ms,
        skipped_documents
    );

    // ── Step 3: Extract and flush ────────────────────────────────────────
    let mut sink = FileReport::timestamped(&config.output_dir);
    let outcome = batch::run_pages(&pages, &model, config, &mut sink, &observer).await?;

    // ── Step 4: Account ──────────────────────────────────────────────────
    let stats = BatchStats {
        total_pages: pages.len(),
        processed_pages: outcome.progress.processed - outcome.progress.failed,
        failed_pages: outcome.progress.failed,
        skipped_documents,
        flushes: outcome.flushes,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
        extract_duration_ms: outcome.progress.cumulative_ms,
    };

    let output_path = sink.created().then(|| sink.path().to_path_buf());
    match &output_path {
        Some(path) => info!(
            "Report written: {} ({}/{} pages, {}ms)",
            path.display(),
            stats.processed_pages,
            stats.total_pages,
            stats.total_duration_ms
        ),
        None => info!("No content extracted; no report written"),
    }

    Ok(BatchSummary { stats, output_path })
}
