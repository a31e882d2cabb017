//! Model endpoint interface: wire types, transport errors, and the Ollama
//! client.
//!
//! The pipeline consumes the vision model as a black box behind the
//! [`VisionModel`] trait. Production code uses [`OllamaClient`]; tests inject
//! a deterministic stub. The trait deliberately returns the *parsed* response
//! rather than extracted text — classifying a missing content field is the
//! Extraction Worker's job ([`crate::pipeline::extract`]), and keeping the
//! transport layer shape-agnostic means a malformed reply is data, not an
//! error, at this level.
//!
//! ## Wire format
//!
//! One request per page: the model identifier, a single user message carrying
//! the fixed prompt text, and exactly one base64 image payload. `stream` is
//! pinned to `false` — the coordinator wants one structured object back, not
//! a token stream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// A chat-completion request for one page image.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier, e.g. `llama3.2-vision:11b-instruct-q8_0`.
    pub model: String,
    /// Exactly one user message for this pipeline.
    pub messages: Vec<ChatMessage>,
    /// Always `false`: the worker parses a single structured response.
    pub stream: bool,
}

/// One message in a chat request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    /// Base64-encoded image payloads attached to this message.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl ChatMessage {
    /// Build the single user message for a page: fixed prompt + one image.
    pub fn user_with_image(prompt: impl Into<String>, image_b64: String) -> Self {
        Self {
            role: "user".to_string(),
            content: prompt.into(),
            images: vec![image_b64],
        }
    }
}

/// A parsed chat response.
///
/// Every field the worker inspects is optional: endpoints occasionally return
/// error objects or truncated bodies with a 200 status, and those must be
/// classifiable as a response-shape failure rather than a deserialisation
/// panic.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    pub message: Option<ResponseMessage>,
}

/// The assistant message inside a [`ChatResponse`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

impl ChatResponse {
    /// Construct a well-formed response. Test-stub convenience.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            message: Some(ResponseMessage {
                content: Some(content.into()),
            }),
        }
    }
}

/// Transport-level failure talking to the model endpoint.
///
/// These never abort the batch — the Extraction Worker converts them into
/// [`crate::error::PageError::Model`] and the coordinator skips the page.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The call exceeded the configured timeout.
    #[error("model call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The endpoint answered with a non-success HTTP status.
    #[error("model endpoint returned HTTP {status}")]
    Http { status: u16 },

    /// Connection failure, DNS failure, or an unparseable body.
    #[error("model endpoint unreachable: {detail}")]
    Network { detail: String },
}

/// The model endpoint as the pipeline sees it: one request in, one parsed
/// response out.
///
/// `Send + Sync` so a single client can be shared across a batch behind an
/// `Arc`. No retries happen behind this trait — a failed call is a failed
/// page.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError>;
}

/// HTTP client for an Ollama-style `/api/chat` endpoint.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a client for `base_url` (e.g. `http://localhost:11434`) with a
    /// per-call timeout.
    ///
    /// The timeout lives on the `reqwest::Client` so every call is under a
    /// bounded-wait policy; a slow page surfaces as
    /// [`TransportError::Timeout`] instead of stalling the batch.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TransportError::Network {
                detail: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }
}

#[async_trait]
impl VisionModel for OllamaClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!("POST {} (model={})", url, request.model);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    TransportError::Network {
                        detail: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
            });
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| TransportError::Network {
                detail: format!("unparseable response body: {e}"),
            })
    }
}
