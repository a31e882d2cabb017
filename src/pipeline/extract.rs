//! Extraction Worker: one page image in, one classified result out.
//!
//! This stage is intentionally thin — the instruction text lives in
//! [`crate::prompts`] and the transport in [`crate::model`], so what remains
//! here is exactly the per-page contract: read the payload, make the single
//! model call, classify the outcome. No retries happen at this layer; a
//! failed page is permanently skipped for this run.
//!
//! ## Memory
//!
//! The raw image bytes are owned by a scope that ends before the model call
//! returns to the coordinator, so peak memory is bounded by one in-flight
//! image (plus its base64 form during the request). Release is structural,
//! not manual.

use crate::config::BatchConfig;
use crate::error::PageError;
use crate::model::{ChatMessage, ChatRequest, VisionModel};
use crate::output::PageResult;
use crate::pipeline::source::PageImage;
use crate::prompts::EXTRACTION_PROMPT;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Extract one page as Markdown via the vision model.
///
/// ## Classification
///
/// * payload missing/unreadable → [`PageError::NotFound`], model **not**
///   contacted
/// * transport/endpoint failure (incl. timeout) → [`PageError::Model`]
/// * response without a content field → [`PageError::ResponseShape`]
/// * otherwise → the content field, verbatim — no post-processing, no
///   markdown validation
///
/// Always returns a [`PageResult`]; errors are data here, so a single bad
/// page never aborts the batch.
pub async fn extract(
    page: &PageImage,
    model: &Arc<dyn VisionModel>,
    config: &BatchConfig,
) -> PageResult {
    let start = Instant::now();

    // Read and encode inside a scope so the raw bytes are released before
    // the (potentially long) model call.
    let image_b64 = {
        let bytes = match tokio::fs::read(&page.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Page {}: payload unreadable: {}", page.position, e);
                return failed(
                    page,
                    start,
                    PageError::NotFound {
                        page: page.position,
                        path: page.path.clone(),
                    },
                );
            }
        };
        STANDARD.encode(&bytes)
    };

    let prompt = config.prompt.as_deref().unwrap_or(EXTRACTION_PROMPT);
    let request = ChatRequest {
        model: config.model.clone(),
        messages: vec![ChatMessage::user_with_image(prompt, image_b64)],
        stream: false,
    };

    let response = match model.chat(&request).await {
        Ok(response) => response,
        Err(e) => {
            return failed(
                page,
                start,
                PageError::Model {
                    page: page.position,
                    detail: e.to_string(),
                },
            );
        }
    };

    let content = response.message.and_then(|m| m.content);
    match content {
        Some(markdown) => {
            let duration = start.elapsed();
            debug!(
                "Page {}: {} bytes of markdown in {:?}",
                page.position,
                markdown.len(),
                duration
            );
            PageResult {
                position: page.position,
                markdown,
                duration_ms: duration.as_millis() as u64,
                error: None,
            }
        }
        None => failed(
            page,
            start,
            PageError::ResponseShape {
                page: page.position,
                detail: "response missing message.content".into(),
            },
        ),
    }
}

fn failed(page: &PageImage, start: Instant, error: PageError) -> PageResult {
    PageResult {
        position: page.position,
        markdown: String::new(),
        duration_ms: start.elapsed().as_millis() as u64,
        error: Some(error),
    }
}
