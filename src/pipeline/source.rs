//! Page Source: scan a directory for documents and produce ordered pages.
//!
//! Two input shapes are accepted side by side: PDF documents, whose pages
//! are rasterised to PNG files in a scratch directory, and standalone page
//! images (`.png`/`.jpg`/`.jpeg`), which pass through untouched. Documents
//! are ordered lexicographically by filename — pages carry no independent
//! numbering, so filename order *is* page order for a batch.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves rasterisation onto a
//! dedicated thread so the async worker threads never stall on CPU-heavy
//! rendering.

use crate::config::{BatchConfig, CorruptDocumentPolicy};
use crate::error::BatchError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One rasterised page, ready for extraction.
///
/// Immutable once produced. The payload lives on disk (scratch directory for
/// PDF pages, the original file for standalone images); the Extraction
/// Worker reads it exactly once, so peak memory stays bounded by a single
/// in-flight image regardless of batch size.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-indexed position in the batch. Report fragments follow this order.
    pub position: usize,
    /// Payload file path.
    pub path: PathBuf,
    /// Source document this page came from.
    pub document: PathBuf,
}

impl PageImage {
    pub fn new(position: usize, path: impl Into<PathBuf>, document: impl Into<PathBuf>) -> Self {
        Self {
            position,
            path: path.into(),
            document: document.into(),
        }
    }
}

/// Kind of document found in the source directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    Image,
}

fn classify(path: &Path) -> Option<DocumentKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(DocumentKind::Pdf),
        "png" | "jpg" | "jpeg" => Some(DocumentKind::Image),
        _ => None,
    }
}

/// List documents in `source_dir`, sorted lexicographically by filename.
///
/// Files are selected by extension only; content is not validated here — a
/// corrupt PDF surfaces later, during rasterisation, under the configured
/// [`CorruptDocumentPolicy`].
///
/// # Errors
/// [`BatchError::SourceUnavailable`] when the directory is missing or
/// unreadable. This is the one Page Source failure that aborts a run.
pub fn list_documents(source_dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let entries = std::fs::read_dir(source_dir).map_err(|e| BatchError::SourceUnavailable {
        path: source_dir.to_path_buf(),
        source: e,
    })?;

    let mut documents: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BatchError::SourceUnavailable {
            path: source_dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_file() && classify(&path).is_some() {
            documents.push(path);
        }
    }

    documents.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("{} documents in {}", documents.len(), source_dir.display());
    Ok(documents)
}

/// Rasterise every document into an ordered page sequence.
///
/// PDF pages land as PNGs in `scratch`; standalone images pass through.
/// Positions are assigned globally, in document order then page order.
///
/// # Returns
/// The ordered pages plus the number of documents that degraded to zero
/// pages under [`CorruptDocumentPolicy::Skip`].
pub async fn collect_pages(
    documents: &[PathBuf],
    config: &BatchConfig,
    scratch: &Path,
) -> Result<(Vec<PageImage>, usize), BatchError> {
    let mut pages: Vec<PageImage> = Vec::new();
    let mut skipped_documents = 0usize;

    for document in documents {
        match classify(document) {
            Some(DocumentKind::Image) => {
                pages.push(PageImage::new(pages.len() + 1, document, document));
            }
            Some(DocumentKind::Pdf) => {
                match rasterize(document, config.max_rendered_pixels, scratch).await {
                    Ok(rendered) => {
                        info!("Rasterised {}: {} pages", document.display(), rendered.len());
                        for path in rendered {
                            pages.push(PageImage::new(pages.len() + 1, path, document));
                        }
                    }
                    Err(detail) => match config.on_corrupt {
                        CorruptDocumentPolicy::Skip => {
                            warn!("Skipping '{}': {}", document.display(), detail);
                            skipped_documents += 1;
                        }
                        CorruptDocumentPolicy::Abort => {
                            return Err(BatchError::CorruptDocument {
                                path: document.clone(),
                                detail,
                            });
                        }
                    },
                }
            }
            None => {}
        }
    }

    Ok((pages, skipped_documents))
}

/// Rasterise one PDF to PNG files in `scratch`, in natural page order.
async fn rasterize(
    pdf_path: &Path,
    max_pixels: u32,
    scratch: &Path,
) -> Result<Vec<PathBuf>, String> {
    let path = pdf_path.to_path_buf();
    let scratch = scratch.to_path_buf();

    tokio::task::spawn_blocking(move || rasterize_blocking(&path, max_pixels, &scratch))
        .await
        .map_err(|e| format!("render task panicked: {e}"))?
}

/// Blocking implementation of PDF rasterisation.
fn rasterize_blocking(
    pdf_path: &Path,
    max_pixels: u32,
    scratch: &Path,
) -> Result<Vec<PathBuf>, String> {
    let pdfium = Pdfium::default();

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| format!("{e:?}"))?;

    let pages = document.pages();
    let total = pages.len() as usize;
    debug!("PDF loaded: {} pages", total);

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());

    let mut rendered = Vec::with_capacity(total);

    for idx in 0..total {
        let page = pages
            .get(idx as u16)
            .map_err(|e| format!("page {}: {e:?}", idx + 1))?;

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| format!("page {}: {e:?}", idx + 1))?;

        let image: DynamicImage = bitmap.as_image();
        let out = scratch.join(format!("{stem}-{:04}.png", idx + 1));
        image
            .save(&out)
            .map_err(|e| format!("page {}: write failed: {e}", idx + 1))?;

        debug!(
            "Rendered page {} → {}x{} px → {}",
            idx + 1,
            image.width(),
            image.height(),
            out.display()
        );
        rendered.push(out);
    }

    Ok(rendered)
}
