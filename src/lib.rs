// ABOUTME: Protocol-translation gateway core fronting one proprietary conversational-AI upstream
// ABOUTME: Normalizes OpenAI-style requests, translates upstream SSE, orchestrates image batches
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

//! # chatbridge — Gateway Core
//!
//! Library implementing the protocol adapter between an OpenAI-compatible
//! client surface and a single proprietary conversational-AI HTTP service:
//! request normalization, upstream envelope construction, SSE stream
//! translation, and wave-based image batch orchestration.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chatbridge::config::GatewayConfig;
//! use chatbridge::signing::{HelperSigner, SharedSigner};
//! use chatbridge::upstream::{ChatEnvelope, UpstreamClient};
//!
//! # async fn example(request: chatbridge::normalize::NormalizedRequest)
//! # -> Result<(), chatbridge::types::GatewayError> {
//! let config = Arc::new(GatewayConfig::new("http://localhost:8080"));
//! let signer: SharedSigner = Arc::new(HelperSigner::new("token-helper".into()));
//! let client = UpstreamClient::new(config, signer);
//!
//! let lines = client.stream_envelope(&ChatEnvelope::from_request(&request)).await?;
//! let events = chatbridge::translate::translate_stream(lines, request.model);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`] — Error taxonomy, normalized messages, stream aliases
//! - [`config`] — Explicit gateway configuration and upstream identity
//! - [`openai`] — OpenAI-compatible wire types for the client surface
//! - [`signing`] — Opaque request-signing capability seam
//! - [`store`] — Transient image store with TTL sweeps
//! - [`normalize`] — Inbound request validation and message cleaning
//! - [`upstream`] — Signed upstream HTTP calls and SSE line framing
//! - [`sse`] — Upstream event classification
//! - [`translate`] — Stream translation and non-streaming aggregation
//! - [`images`] — Wave-based image batch orchestration

/// Error taxonomy, normalized messages, stream aliases
pub mod types;

/// Explicit gateway configuration and the fixed upstream client identity
pub mod config;
/// Wave-based image batch orchestration
pub mod images;
/// Inbound request validation and message cleaning
pub mod normalize;
/// OpenAI-compatible wire types
pub mod openai;
/// Opaque request-signing capability
pub mod signing;
/// Upstream SSE event classification
pub mod sse;
/// Transient image store
pub mod store;
/// Stream translation and aggregation
pub mod translate;
/// Signed upstream HTTP client and envelopes
pub mod upstream;

// Re-export the handful of types nearly every caller needs
pub use config::GatewayConfig;
pub use signing::{HelperSigner, SharedSigner, TokenSigner};
pub use store::ImageStore;
pub use types::{ErrorKind, GatewayError};
pub use upstream::UpstreamClient;
