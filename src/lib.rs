//! # pagemill
//!
//! Batch-convert PDF documents and standalone page images to Markdown using
//! a vision-capable model.
//!
//! ## Why this crate?
//!
//! Traditional PDF-to-text tools fail on complex layouts — tables,
//! multi-column text, and forms come out garbled or out of reading order.
//! pagemill rasterises each page and lets a vision model read it as a human
//! would, then concatenates per-page Markdown (in page order) into a single
//! timestamped report. One bad page never takes down the batch: failures
//! are logged, counted, and skipped.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source dir
//!  │
//!  ├─ 1. Source    scan for .pdf/.png/.jpg, lexicographic order
//!  ├─ 2. Rasterise PDF pages → scratch PNGs via pdfium (spawn_blocking)
//!  ├─ 3. Extract   one model call per page, strictly sequential
//!  ├─ 4. Accumulate page-ordered Markdown, flush every N pages
//!  └─ 5. Report    combined_output_<timestamp>.md (append-only)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagemill::{run, BatchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Talks to a local Ollama endpoint by default.
//!     let config = BatchConfig::default();
//!     let summary = run("./data", &config).await?;
//!     if let Some(path) = summary.output_path {
//!         println!("report: {}", path.display());
//!     }
//!     eprintln!(
//!         "{}/{} pages, {} failed",
//!         summary.stats.processed_pages,
//!         summary.stats.total_pages,
//!         summary.stats.failed_pages
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagemill` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pagemill = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{run_pages, BatchOutcome};
pub use config::{BatchConfig, BatchConfigBuilder, CorruptDocumentPolicy};
pub use error::{BatchError, PageError};
pub use model::{ChatMessage, ChatRequest, ChatResponse, OllamaClient, TransportError, VisionModel};
pub use output::{BatchStats, BatchSummary, PageResult};
pub use pipeline::source::PageImage;
pub use progress::{BatchObserver, BatchProgress, NoopObserver};
pub use report::{FileReport, ReportSink};
pub use run::{run, run_with_observer};
