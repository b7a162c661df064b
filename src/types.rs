// ABOUTME: Core types for the gateway — error taxonomy, message roles, normalized messages
// ABOUTME: Provides GatewayError, NormalizedMessage/InlineImage, and stream aliases
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

//! # Core Types
//!
//! Self-contained type definitions shared by every gateway component:
//! the error taxonomy, normalized conversation messages as sent upstream,
//! and the boxed stream aliases used at async seams.

use std::fmt;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio_stream::Stream;

// ============================================================================
// Error Type
// ============================================================================

/// Error type for gateway operations
#[derive(Debug, Clone)]
pub struct GatewayError {
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

/// Categories of errors produced by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed client input: bad JSON, unknown model, empty conversation
    InvalidRequest,
    /// The token signing step failed; the surfaced message stays opaque
    AuthFailure,
    /// The upstream service could not be reached or dropped the connection
    UpstreamTransport,
    /// The upstream sent a response the gateway could not interpret
    UpstreamProtocol,
    /// An image batch collected zero results after all attempts
    Exhausted,
    /// Internal gateway error (bug, unexpected state)
    Internal,
}

impl GatewayError {
    /// Create an invalid-request error (surfaced verbatim to the client)
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidRequest,
            message: message.into(),
        }
    }

    /// Create an auth failure error
    ///
    /// Signing internals are never included in the message.
    pub fn auth_failure(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::AuthFailure,
            message: message.into(),
        }
    }

    /// Create an upstream transport error
    pub fn upstream_transport(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::UpstreamTransport,
            message: message.into(),
        }
    }

    /// Create an upstream protocol error
    pub fn upstream_protocol(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::UpstreamProtocol,
            message: message.into(),
        }
    }

    /// Create a generation-exhausted error
    pub fn exhausted(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Exhausted,
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for GatewayError {}

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction message
    System,
    /// User input message
    User,
    /// Assistant response message
    Assistant,
}

impl MessageRole {
    /// Convert to string representation for wire payloads
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// An image attached to a normalized message
///
/// Holds either a passthrough remote URL or a self-hosted URL derived
/// from a persisted transient asset. The wire shape is `{"data": <url>}`,
/// matching what the upstream expects in a message `images` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineImage {
    /// URL the upstream can fetch the image from
    pub data: String,
}

impl InlineImage {
    /// Wrap a URL as an inline image reference
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { data: url.into() }
    }
}

/// A conversation message after normalization
///
/// Invariant: a `NormalizedMessage` has non-empty `content`, non-empty
/// `images`, or both — the normalizer drops messages where both are empty
/// before they can be constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Space-joined, trimmed text content (may be empty if images exist)
    pub content: String,
    /// Ordered image references resolved from the inbound request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<InlineImage>,
}

impl NormalizedMessage {
    /// Create a text-only message
    #[must_use]
    pub fn text(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: Vec::new(),
        }
    }

    /// Create a message carrying text and/or images
    #[must_use]
    pub fn with_images(
        role: MessageRole,
        content: impl Into<String>,
        images: Vec<InlineImage>,
    ) -> Self {
        Self {
            role,
            content: content.into(),
            images,
        }
    }

    /// Whether the message survived normalization with any payload
    #[must_use]
    pub fn has_payload(&self) -> bool {
        !self.content.is_empty() || !self.images.is_empty()
    }
}

// ============================================================================
// Stream Aliases
// ============================================================================

/// A single `data:` line payload from the upstream SSE feed
///
/// The line stream yields the payload after the `data: ` prefix has been
/// stripped, one item per upstream event, including the `[DONE]` sentinel.
pub type SseLine = String;

/// Stream of upstream SSE payload lines
pub type LineStream = Pin<Box<dyn Stream<Item = Result<SseLine, GatewayError>> + Send>>;
