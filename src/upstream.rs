// ABOUTME: Upstream HTTP client — signed envelope POSTs, storage lookups, SSE line framing
// ABOUTME: Builds the proprietary chat and image envelopes and streams data lines back
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio_stream::Stream;
use tracing::{debug, warn};

use crate::config::{identity, GatewayConfig};
use crate::normalize::NormalizedRequest;
use crate::signing::SharedSigner;
use crate::sse;
use crate::types::{GatewayError, LineStream, MessageRole, NormalizedMessage};

// ============================================================================
// Envelopes
// ============================================================================

/// Outbound chat envelope in the upstream's proprietary shape
///
/// Built once from a normalized request and never mutated; serialization
/// is deterministic (fixed field order).
#[derive(Debug, Clone, Serialize)]
pub struct ChatEnvelope {
    /// Image generation disabled on the chat path
    pub function_image_gen: bool,
    /// Web search stays on; its results are transmuted client-side
    pub function_web_search: bool,
    /// Token budget
    pub max_tokens: u32,
    /// Validated model id
    pub model: String,
    /// Upstream request source tag
    pub source: &'static str,
    /// Sampling temperature
    pub temperature: f64,
    /// Nucleus sampling parameter
    pub top_p: f64,
    /// Normalized conversation
    pub messages: Vec<NormalizedMessage>,
}

impl ChatEnvelope {
    /// Build the chat envelope for a normalized request
    #[must_use]
    pub fn from_request(request: &NormalizedRequest) -> Self {
        Self {
            function_image_gen: false,
            function_web_search: true,
            max_tokens: request.max_tokens,
            model: request.model.clone(),
            source: "chat/pro",
            temperature: request.temperature,
            top_p: request.top_p,
            messages: request.messages.clone(),
        }
    }
}

/// Outbound single-image generation envelope
///
/// Everything except the prompt is fixed: the upstream only renders one
/// image per call, with a forced aspect ratio and style, on one model.
#[derive(Debug, Clone, Serialize)]
pub struct ImageEnvelope {
    /// Image generation enabled
    pub function_image_gen: bool,
    /// Kept on to match the upstream client's request shape
    pub function_web_search: bool,
    /// Forced aspect ratio
    pub image_aspect_ratio: &'static str,
    /// Forced style
    pub image_style: &'static str,
    /// Fixed token budget
    pub max_tokens: u32,
    /// Artist system prompt plus the user's draw instruction
    pub messages: Vec<NormalizedMessage>,
    /// Fixed image-capable model
    pub model: &'static str,
    /// Upstream request source tag
    pub source: &'static str,
}

impl ImageEnvelope {
    /// Build the fixed single-image envelope around a prompt
    #[must_use]
    pub fn new(prompt: &str) -> Self {
        Self {
            function_image_gen: true,
            function_web_search: true,
            image_aspect_ratio: "1:1",
            image_style: "photographic",
            max_tokens: 8000,
            messages: vec![
                NormalizedMessage::text(
                    MessageRole::System,
                    "You are a helpful artist, please based on imagination draw a picture.",
                ),
                NormalizedMessage::text(MessageRole::User, format!("Draw: {prompt}")),
            ],
            model: "gpt-4o",
            source: "chat/pro_image",
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for the single fixed upstream service
///
/// Owns the reqwest client, the signing capability and the endpoint
/// configuration. Cheap to clone.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    signer: SharedSigner,
    config: Arc<GatewayConfig>,
}

impl UpstreamClient {
    /// Create a client for the configured upstream
    #[must_use]
    pub fn new(config: Arc<GatewayConfig>, signer: SharedSigner) -> Self {
        Self {
            http: reqwest::Client::new(),
            signer,
            config,
        }
    }

    /// POST a signed envelope to the chat/stream endpoint
    ///
    /// Returns the upstream SSE feed as a stream of `data:` payload
    /// lines. The payload is signed byte-for-byte as serialized here.
    pub async fn stream_envelope<E: Serialize>(
        &self,
        envelope: &E,
    ) -> Result<LineStream, GatewayError> {
        let payload = serde_json::to_string(envelope)
            .map_err(|e| GatewayError::internal(format!("envelope serialization failed: {e}")))?;

        let token = self.signer.sign(&payload).await?;
        debug!(bytes = payload.len(), "Posting signed envelope upstream");

        let response = self
            .http
            .post(&self.config.upstream_url)
            .header("Date", &token.date)
            .header("Client-time-zone", identity::CLIENT_TIME_ZONE)
            .header("Authorization", &token.authorization)
            .header("User-Agent", identity::USER_AGENT)
            .header("Accept-Language", identity::ACCEPT_LANGUAGE)
            .header("X-Cl-Options", identity::CL_OPTIONS)
            .header("Content-Type", identity::CONTENT_TYPE)
            .body(payload)
            .send()
            .await
            .map_err(|e| GatewayError::upstream_transport(format!("upstream request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::upstream_transport(format!(
                "upstream returned status {status}"
            )));
        }

        Ok(split_sse_lines(response.bytes_stream()))
    }

    /// Resolve a storage path into its final download URL
    ///
    /// GETs the storage-lookup endpoint and extracts `getUrl` from the
    /// returned JSON.
    pub async fn resolve_storage_path(&self, path: &str) -> Result<String, GatewayError> {
        let url = format!("{}/{}", self.config.storage_url_base, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::upstream_transport(format!("storage lookup failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::upstream_transport(format!(
                "storage lookup returned status {status}"
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::upstream_protocol(format!("storage response not JSON: {e}")))?;

        json.get("getUrl")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .ok_or_else(|| GatewayError::upstream_protocol("storage response missing getUrl"))
    }

    /// Download raw bytes from a resolved image URL
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, GatewayError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::upstream_transport(format!("image download failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::upstream_transport(format!(
                "image download returned status {status}"
            )));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| GatewayError::upstream_transport(format!("image download failed: {e}")))
    }
}

// ============================================================================
// SSE Line Framing
// ============================================================================

/// Split a byte stream into upstream `data:` payload lines
///
/// Bytes are buffered until a newline; only complete lines are decoded,
/// so multi-byte characters split across network chunks survive intact.
/// Non-`data:` lines (comments, blank separators) are discarded. A
/// transport error surfaces once, as the final item.
pub(crate) fn split_sse_lines<S, B, E>(byte_stream: S) -> LineStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: fmt::Display + Send,
{
    Box::pin(async_stream::try_stream! {
        futures::pin_mut!(byte_stream);
        let mut buf: Vec<u8> = Vec::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk.map_err(|e| {
                GatewayError::upstream_transport(format!("upstream stream failed: {e}"))
            })?;
            buf.extend_from_slice(chunk.as_ref());

            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let line_bytes: Vec<u8> = buf.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line_bytes);
                let line = line.trim_end_matches(['\n', '\r']);
                if let Some(payload) = sse::parse_data_line(line) {
                    yield payload.to_owned();
                }
            }
        }

        // Trailing line without a final newline
        if !buf.is_empty() {
            let line = String::from_utf8_lossy(&buf);
            if let Some(payload) = sse::parse_data_line(line.trim_end_matches('\r')) {
                yield payload.to_owned();
            } else {
                warn!("Discarding incomplete trailing SSE line");
            }
        }
    })
}
