//! The fixed extraction prompt sent with every page image.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the instruction (e.g. table
//!    handling) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the prompt directly without
//!    spinning up a real model.
//!
//! Callers can override it via [`crate::config::BatchConfig::prompt`]; the
//! constant here is used only when no override is provided.

/// Default instruction for converting one page image to Markdown.
///
/// Used when `BatchConfig::prompt` is `None`. The wording is deliberately
/// short: vision models follow a handful of firm rules better than a page of
/// prose, and the three that matter are order preservation, markdown tables,
/// and no code-block wrapping.
pub const EXTRACTION_PROMPT: &str = "Extract the content of this image as a markdown document. \
Do not wrap in a markdown code block. \
Ensure the order of content is preserved in the final output. \
Tables should be returned as a markdown table.";
