// ABOUTME: Request normalizer — validates model, cleans messages, resolves inline images
// ABOUTME: Produces the normalized conversation the upstream envelope is built from
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, warn};

use crate::config::{GatewayConfig, DEFAULT_MODEL, SUPPORTED_MODELS};
use crate::openai::{ChatCompletionRequest, MessageContent};
use crate::store::ImageStore;
use crate::types::{GatewayError, InlineImage, MessageRole, NormalizedMessage};

/// Sampling defaults applied when the client omits the fields
const DEFAULT_TEMPERATURE: f64 = 1.0;
const DEFAULT_TOP_P: f64 = 1.0;
const DEFAULT_MAX_TOKENS: u32 = 8000;

/// A chat request after validation and message cleaning
///
/// Every message satisfies the non-empty invariant: text, images, or both.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    /// Validated model id
    pub model: String,
    /// Surviving messages, in request order
    pub messages: Vec<NormalizedMessage>,
    /// Temperature, defaulted when absent
    pub temperature: f64,
    /// Nucleus sampling parameter, defaulted when absent
    pub top_p: f64,
    /// Token budget, defaulted when absent
    pub max_tokens: u32,
    /// Whether the client asked for a streamed response
    pub stream: bool,
}

impl NormalizedRequest {
    /// All inline images across the conversation, in message order
    #[must_use]
    pub fn inline_images(&self) -> Vec<InlineImage> {
        self.messages
            .iter()
            .flat_map(|m| m.images.iter().cloned())
            .collect()
    }
}

/// Validate and normalize an inbound chat completion request
///
/// Inline base64 images are decoded and persisted through the store,
/// producing self-hosted URLs; remote URLs pass through unchanged.
/// Messages left with neither text nor images are dropped silently.
pub async fn normalize_request(
    request: &ChatCompletionRequest,
    store: &ImageStore,
) -> Result<NormalizedRequest, GatewayError> {
    let model = request
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_MODEL.to_owned());

    if !GatewayConfig::is_supported_model(&model) {
        return Err(GatewayError::invalid_request(format!(
            "invalid model: {model}. Supported models: {}",
            SUPPORTED_MODELS.join(", ")
        )));
    }

    let mut messages = Vec::with_capacity(request.messages.len());
    for incoming in &request.messages {
        let role = parse_role(&incoming.role);
        match &incoming.content {
            MessageContent::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    debug!("Dropped message with empty string content");
                } else {
                    messages.push(NormalizedMessage::text(role, trimmed));
                }
            }
            MessageContent::Parts(parts) => {
                let mut text_parts = Vec::new();
                let mut images = Vec::new();

                for part in parts {
                    if let Some(text) = &part.text {
                        text_parts.push(text.as_str());
                    } else if let Some(image) = &part.image_url {
                        images.push(resolve_image(&image.url, store).await?);
                    }
                }

                let content = text_parts.join(" ").trim().to_owned();
                if content.is_empty() && images.is_empty() {
                    debug!("Dropped multi-part message with no surviving content");
                } else {
                    messages.push(NormalizedMessage::with_images(role, content, images));
                }
            }
        }
    }

    if messages.is_empty() {
        return Err(GatewayError::invalid_request(
            "all messages have empty content",
        ));
    }

    Ok(NormalizedRequest {
        model,
        messages,
        temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        top_p: request.top_p.unwrap_or(DEFAULT_TOP_P),
        max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        stream: request.stream,
    })
}

/// Map a role string onto the known roles, defaulting unknowns to user
fn parse_role(role: &str) -> MessageRole {
    match role {
        "system" => MessageRole::System,
        "assistant" => MessageRole::Assistant,
        "user" => MessageRole::User,
        other => {
            warn!(role = other, "Unknown message role, mapping to user");
            MessageRole::User
        }
    }
}

/// Resolve one image part into an upstream-fetchable URL
///
/// Data URIs are decoded and persisted as a fresh transient asset; any
/// other URL passes through untouched.
async fn resolve_image(url: &str, store: &ImageStore) -> Result<InlineImage, GatewayError> {
    if !url.starts_with("data:image/") {
        return Ok(InlineImage::new(url));
    }

    let encoded = url
        .split_once(',')
        .map(|(_, payload)| payload)
        .ok_or_else(|| GatewayError::invalid_request("malformed image data URI"))?;

    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| GatewayError::invalid_request(format!("invalid base64 image data: {e}")))?;

    let filename = store.persist(&bytes).await?;
    Ok(InlineImage::new(store.resolve(&filename)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_store(dir: &std::path::Path) -> ImageStore {
        ImageStore::new(
            dir.to_path_buf(),
            Duration::from_secs(60),
            "http://localhost:8080",
        )
    }

    fn request_from_json(json: &str) -> ChatCompletionRequest {
        serde_json::from_str(json).expect("deserialize request")
    }

    #[tokio::test]
    async fn unknown_model_is_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let request =
            request_from_json(r#"{"model":"gpt-5","messages":[{"role":"user","content":"hi"}]}"#);
        let err = normalize_request(&request, &test_store(tmp.path()))
            .await
            .expect_err("should reject");
        assert_eq!(err.kind, crate::types::ErrorKind::InvalidRequest);
        assert!(err.message.contains("gpt-5"));
    }

    #[tokio::test]
    async fn missing_model_defaults_and_passes() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let request = request_from_json(r#"{"messages":[{"role":"user","content":"hi"}]}"#);
        let normalized = normalize_request(&request, &test_store(tmp.path()))
            .await
            .expect("normalize");
        assert_eq!(normalized.model, "gpt-4o");
        assert_eq!(normalized.max_tokens, 8000);
        assert!((normalized.temperature - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn empty_messages_are_dropped_silently() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let request = request_from_json(
            r#"{"model":"gpt-4o","messages":[
                {"role":"user","content":"  "},
                {"role":"user","content":"hello"},
                {"role":"assistant","content":""}
            ]}"#,
        );
        let normalized = normalize_request(&request, &test_store(tmp.path()))
            .await
            .expect("normalize");
        assert_eq!(normalized.messages.len(), 1);
        assert_eq!(normalized.messages[0].content, "hello");
    }

    #[tokio::test]
    async fn all_empty_conversation_is_invalid() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let request = request_from_json(
            r#"{"model":"gpt-4o","messages":[{"role":"user","content":" "}]}"#,
        );
        let err = normalize_request(&request, &test_store(tmp.path()))
            .await
            .expect_err("should reject");
        assert_eq!(err.kind, crate::types::ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn text_parts_are_space_joined() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let request = request_from_json(
            r#"{"model":"gpt-4o","messages":[{"role":"user","content":[
                {"type":"text","text":"look at"},
                {"type":"text","text":"this"}
            ]}]}"#,
        );
        let normalized = normalize_request(&request, &test_store(tmp.path()))
            .await
            .expect("normalize");
        assert_eq!(normalized.messages[0].content, "look at this");
    }

    #[tokio::test]
    async fn remote_image_url_passes_through() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let request = request_from_json(
            r#"{"model":"gpt-4o","messages":[{"role":"user","content":[
                {"type":"image_url","image_url":{"url":"https://example.com/cat.png"}}
            ]}]}"#,
        );
        let normalized = normalize_request(&request, &test_store(tmp.path()))
            .await
            .expect("normalize");
        assert_eq!(normalized.messages.len(), 1);
        assert!(normalized.messages[0].content.is_empty());
        assert_eq!(
            normalized.messages[0].images[0].data,
            "https://example.com/cat.png"
        );
    }

    #[tokio::test]
    async fn data_uri_is_persisted_and_round_trips() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = test_store(tmp.path());
        let payload = b"fake png bytes";
        let encoded = BASE64.encode(payload);
        let json = format!(
            r#"{{"model":"gpt-4o","messages":[{{"role":"user","content":[
                {{"type":"text","text":"what is this"}},
                {{"type":"image_url","image_url":{{"url":"data:image/png;base64,{encoded}"}}}}
            ]}}]}}"#
        );
        let request = request_from_json(&json);
        let normalized = normalize_request(&request, &store).await.expect("normalize");

        let url = &normalized.messages[0].images[0].data;
        assert!(url.starts_with("http://localhost:8080/images/"));

        // The persisted bytes must be identical to the decoded payload
        let filename = url.rsplit('/').next().expect("filename");
        let path = store.asset_path(filename).expect("path");
        let on_disk = tokio::fs::read(path).await.expect("read");
        assert_eq!(on_disk, payload);
    }

    #[tokio::test]
    async fn invalid_base64_data_uri_is_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let request = request_from_json(
            r#"{"model":"gpt-4o","messages":[{"role":"user","content":[
                {"type":"image_url","image_url":{"url":"data:image/png;base64,@@@"}}
            ]}]}"#,
        );
        let err = normalize_request(&request, &test_store(tmp.path()))
            .await
            .expect_err("should reject");
        assert_eq!(err.kind, crate::types::ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn inline_images_collects_in_order() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let request = request_from_json(
            r#"{"model":"gpt-4o","messages":[
                {"role":"user","content":[
                    {"type":"image_url","image_url":{"url":"https://example.com/a.png"}}
                ]},
                {"role":"user","content":[
                    {"type":"text","text":"and"},
                    {"type":"image_url","image_url":{"url":"https://example.com/b.png"}}
                ]}
            ]}"#,
        );
        let normalized = normalize_request(&request, &test_store(tmp.path()))
            .await
            .expect("normalize");
        let images = normalized.inline_images();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].data, "https://example.com/a.png");
        assert_eq!(images[1].data, "https://example.com/b.png");
    }
}
