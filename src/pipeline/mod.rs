//! Pipeline stages for batch page extraction.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap
//! implementations (e.g. a different rasterisation backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! source ──▶ extract ──▶ coordinator ──▶ report
//! (scan+raster) (model)   (accumulate)   (append)
//! ```
//!
//! 1. [`source`]  — scan the source directory and rasterise PDF pages to a
//!    scratch location; runs pdfium in `spawn_blocking` because it is not
//!    async-safe
//! 2. [`extract`] — read one page payload, drive the single model call, and
//!    classify the response; the only stage with network I/O

pub mod extract;
pub mod source;
