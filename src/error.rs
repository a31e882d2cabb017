//! Error types for the pagemill library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BatchError`] — **Fatal**: the batch cannot proceed at all (source
//!   directory missing, report file unwritable, bad configuration).
//!   Returned as `Err(BatchError)` from [`crate::run`].
//!
//! * [`PageError`] — **Non-fatal**: a single page failed (payload vanished,
//!   model unreachable, malformed response) but every other page is fine.
//!   Stored inside [`crate::output::PageResult`] so the coordinator can log
//!   the failure, count it, and move on to the next page.
//!
//! No unit of work is ever retried: a failed page is permanently skipped for
//! this run, a corrupt document degrades to zero pages (unless configured to
//! abort), and only source and write failures stop the batch.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pagemill library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum BatchError {
    // ── Source errors ─────────────────────────────────────────────────────
    /// The source directory does not exist or cannot be read.
    #[error("Source directory unavailable: '{path}': {source}\nCheck the path exists and is readable.")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document could not be rasterised.
    ///
    /// Surfaced only when [`crate::config::CorruptDocumentPolicy::Abort`] is
    /// configured; the default policy logs the document and produces zero
    /// pages for it instead.
    #[error("Cannot rasterise '{path}': {detail}")]
    CorruptDocument { path: PathBuf, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or append to the report file. The report is the only
    /// product of a run, so this stops the batch.
    #[error("Failed to write report '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored alongside [`crate::output::PageResult`] when a page fails.
/// The batch always continues to the next page.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The page payload file is missing or unreadable.
    ///
    /// Classified before any model contact — the endpoint never sees a
    /// request for a page that cannot be read.
    #[error("Page {page}: payload not found: '{path}'")]
    NotFound { page: usize, path: PathBuf },

    /// The model endpoint could not be reached, rejected the call, or timed
    /// out.
    #[error("Page {page}: model call failed: {detail}")]
    Model { page: usize, detail: String },

    /// The endpoint answered, but the response was missing the expected
    /// content field.
    #[error("Page {page}: unexpected response shape: {detail}")]
    ResponseShape { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page position this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::NotFound { page, .. }
            | PageError::Model { page, .. }
            | PageError::ResponseShape { page, .. } => *page,
        }
    }
}
