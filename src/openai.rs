// ABOUTME: OpenAI-compatible wire types for the client-facing API surface
// ABOUTME: Chat completion request/response/chunk, image generation, models, and error envelopes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

use serde::{Deserialize, Serialize};

use crate::types::InlineImage;

// ============================================================================
// Request Types
// ============================================================================

/// OpenAI-compatible chat completion request
///
/// Message content may be a plain string or a multi-part array mixing
/// `text` and `image_url` parts, as sent by multi-modal clients.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model identifier; defaults to the gateway default when omitted
    #[serde(default)]
    pub model: Option<String>,
    /// Conversation messages
    pub messages: Vec<IncomingMessage>,
    /// Temperature for response randomness
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Nucleus sampling parameter
    #[serde(default)]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

/// A message as received from the client, before normalization
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    /// Role string ("system", "user", "assistant")
    pub role: String,
    /// String or multi-part content
    pub content: MessageContent,
}

/// Message content: a plain string or an array of typed parts
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain string content (standard `OpenAI`)
    Text(String),
    /// Multi-part content with text and image parts
    Parts(Vec<ContentPart>),
}

/// One part of a multi-part message
///
/// Parts are matched structurally on which field is present, mirroring
/// how multi-modal clients emit them; the `type` tag is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentPart {
    /// Text payload, present for text parts
    #[serde(default)]
    pub text: Option<String>,
    /// Image reference, present for image parts
    #[serde(default)]
    pub image_url: Option<ImageUrl>,
}

/// Image reference within a content part
#[derive(Debug, Clone, Deserialize)]
pub struct ImageUrl {
    /// Remote URL or `data:image/...;base64,` URI
    pub url: String,
}

/// OpenAI-compatible image generation request
#[derive(Debug, Clone, Deserialize)]
pub struct ImageGenerationRequest {
    /// Text prompt to render
    #[serde(default)]
    pub prompt: Option<String>,
    /// Model identifier echoed back in the response
    #[serde(default)]
    pub model: Option<String>,
    /// Number of images to generate
    #[serde(default)]
    pub n: Option<u32>,
    /// Requested size (accepted, unused — the upstream renders one fixed aspect)
    #[serde(default)]
    pub size: Option<String>,
    /// "url" or "b64_json"
    #[serde(default)]
    pub response_format: Option<String>,
}

// ============================================================================
// Response Types (non-streaming)
// ============================================================================

/// OpenAI-compatible chat completion response
#[derive(Debug, Serialize)]
pub struct ChatCompletionResponse {
    /// Unique response identifier
    pub id: String,
    /// Object type (always "chat.completion")
    pub object: &'static str,
    /// Unix timestamp of creation
    pub created: u64,
    /// Model echoed from the request
    pub model: String,
    /// Response choices (always one)
    pub choices: Vec<Choice>,
}

/// A single choice in a chat completion response
#[derive(Debug, Serialize)]
pub struct Choice {
    /// Choice index (always 0)
    pub index: u32,
    /// Generated message
    pub message: ResponseMessage,
    /// Reason the generation stopped
    pub finish_reason: Option<String>,
}

/// Message in a chat completion response
#[derive(Debug, Serialize)]
pub struct ResponseMessage {
    /// Role (always "assistant")
    pub role: &'static str,
    /// Aggregated content
    pub content: String,
    /// Inline images echoed from the normalized request, when any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<InlineImage>>,
}

// ============================================================================
// Streaming Response Types
// ============================================================================

/// OpenAI-compatible streaming chunk
#[derive(Debug, Serialize)]
pub struct ChatCompletionChunk {
    /// Chunk identifier
    pub id: String,
    /// Object type (always "chat.completion.chunk")
    pub object: &'static str,
    /// Unix timestamp of creation
    pub created: u64,
    /// Model id stamped onto the chunk
    pub model: String,
    /// Synthetic system fingerprint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
    /// Streaming choices
    pub choices: Vec<ChunkChoice>,
}

/// A single choice in a streaming chunk
#[derive(Debug, Serialize)]
pub struct ChunkChoice {
    /// Choice index
    pub index: u32,
    /// Content delta
    pub delta: Delta,
    /// Reason the generation stopped (only on final chunk)
    pub finish_reason: Option<String>,
}

/// Delta content in a streaming chunk
#[derive(Debug, Serialize)]
pub struct Delta {
    /// Role (only present on the first chunk)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'static str>,
    /// Content fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

// ============================================================================
// Image Generation Response
// ============================================================================

/// Response for POST /v1/images/generations
#[derive(Debug, Serialize)]
pub struct ImageGenerationResponse {
    /// Unix timestamp of creation
    pub created: u64,
    /// Generated images, exactly `n` in url mode
    pub data: Vec<ImageDatum>,
}

/// A single generated image, as a URL or base64 payload
#[derive(Debug, Clone, Serialize)]
pub struct ImageDatum {
    /// Image URL (url mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Base64-encoded image bytes (b64_json mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b64_json: Option<String>,
}

impl ImageDatum {
    /// Build a url-mode datum
    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            b64_json: None,
        }
    }

    /// Build a b64-mode datum
    #[must_use]
    pub fn b64(encoded: impl Into<String>) -> Self {
        Self {
            url: None,
            b64_json: Some(encoded.into()),
        }
    }
}

// ============================================================================
// Models Endpoint
// ============================================================================

/// Response for GET /v1/models
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    /// Object type (always "list")
    pub object: &'static str,
    /// Available models
    pub data: Vec<ModelObject>,
}

/// A single model entry in the models list
#[derive(Debug, Serialize)]
pub struct ModelObject {
    /// Model identifier
    pub id: String,
    /// Object type (always "model")
    pub object: &'static str,
    /// Owner name
    pub owned_by: &'static str,
}

// ============================================================================
// Error Response
// ============================================================================

/// OpenAI-compatible error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Error detail within an error response
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error message
    pub message: String,
    /// Error type
    #[serde(rename = "type")]
    pub error_type: String,
}

impl ErrorResponse {
    /// Build an error response with the given type and message
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                error_type: error_type.into(),
            },
        }
    }
}
