//! Configuration types for batch extraction.
//!
//! All batch behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`]. Keeping every knob in one struct means the basic,
//! memory-tuned, and interactive flavours of the pipeline are a single
//! coordinator with different option values, not three near-duplicate code
//! paths.
//!
//! # Design choice: builder over constructor
//! A ten-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::BatchError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for one batch extraction run.
///
/// Built via [`BatchConfig::builder()`] or using [`BatchConfig::default()`].
///
/// # Example
/// ```rust
/// use pagemill::BatchConfig;
///
/// let config = BatchConfig::builder()
///     .model("llama3.2-vision:11b-instruct-q8_0")
///     .flush_every(5)
///     .page_delay_ms(1000)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Base URL of the model endpoint. Default: `http://localhost:11434`.
    pub endpoint: String,

    /// Vision model identifier sent with every request.
    /// Default: `llama3.2-vision:11b-instruct-q8_0`.
    pub model: String,

    /// Flush the accumulated report to disk every this many pages. Default: 5.
    ///
    /// Periodic flushing bounds memory across very large documents and gives
    /// crash-resilience: everything flushed before a crash survives on disk.
    /// The remainder after the last page is always flushed as well.
    pub flush_every: usize,

    /// Pause between pages in milliseconds. Default: 1000.
    ///
    /// A load-smoothing knob for the model endpoint, not a correctness
    /// requirement. Set to 0 in tests or when the endpoint has headroom.
    pub page_delay_ms: u64,

    /// Maximum rendered page dimension (width or height) in pixels. Default: 2000.
    ///
    /// A safety cap on rasterisation: an A0 poster rendered without one could
    /// produce a 13 000 × 18 000 px image and exhaust memory. Either dimension
    /// is capped, scaling the other proportionally.
    pub max_rendered_pixels: u32,

    /// Per-model-call timeout in seconds. Default: 120.
    ///
    /// Local vision models can take a minute per dense page. A timed-out call
    /// is classified as [`crate::error::PageError::Model`] and the page is
    /// skipped — the batch never hangs on one page.
    pub api_timeout_secs: u64,

    /// Custom extraction prompt. If None, uses the built-in default.
    pub prompt: Option<String>,

    /// What to do when a source document cannot be rasterised. Default: Skip.
    pub on_corrupt: CorruptDocumentPolicy,

    /// Directory the timestamped report is written under. Default: `./output`.
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2-vision:11b-instruct-q8_0".to_string(),
            flush_every: 5,
            page_delay_ms: 1000,
            max_rendered_pixels: 2000,
            api_timeout_secs: 120,
            prompt: None,
            on_corrupt: CorruptDocumentPolicy::default(),
            output_dir: PathBuf::from("./output"),
        }
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn flush_every(mut self, n: usize) -> Self {
        self.config.flush_every = n.max(1);
        self
    }

    pub fn page_delay_ms(mut self, ms: u64) -> Self {
        self.config.page_delay_ms = ms;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn on_corrupt(mut self, policy: CorruptDocumentPolicy) -> Self {
        self.config.on_corrupt = policy;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, BatchError> {
        let c = &self.config;
        if c.flush_every == 0 {
            return Err(BatchError::InvalidConfig(
                "flush_every must be ≥ 1".into(),
            ));
        }
        if c.model.is_empty() {
            return Err(BatchError::InvalidConfig("model must not be empty".into()));
        }
        if c.endpoint.is_empty() {
            return Err(BatchError::InvalidConfig(
                "endpoint must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What the Page Source does with a document it cannot rasterise.
///
/// The skip policy mirrors page-level isolation at the document level: one
/// unreadable PDF degrades to zero pages instead of taking the whole batch
/// down. Abort is for callers who would rather notice a corrupt input than
/// ship a report silently missing a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CorruptDocumentPolicy {
    /// Log the document, produce zero pages for it, continue. (default)
    #[default]
    Skip,
    /// Abort the run with [`crate::error::BatchError::CorruptDocument`].
    Abort,
}
