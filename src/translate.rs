// ABOUTME: Stream translator — rewrites the classified upstream feed into client events
// ABOUTME: Streaming chunk emission and non-streaming aggregation with one terminal event
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

//! # Stream Translation
//!
//! Drives [`sse::classify`] over an upstream line stream and produces the
//! client-facing sequence. A translated session always ends with exactly
//! one terminal event — the done sentinel or an error — never a bare
//! disconnect. Translation is a pure function of the upstream line
//! sequence apart from the stamped ids and timestamps.

use std::pin::Pin;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::StreamExt;
use tokio_stream::Stream;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::DEFAULT_MODEL;
use crate::openai::{
    ChatCompletionChunk, ChatCompletionResponse, Choice, ChunkChoice, Delta, ResponseMessage,
};
use crate::sse::{self, SseEvent};
use crate::types::{GatewayError, InlineImage, LineStream};

/// One client-facing event from a translated session
#[derive(Debug)]
pub enum ClientEvent {
    /// An OpenAI-shaped content chunk
    Chunk(ChatCompletionChunk),
    /// Clean end of stream; the boundary renders `data: [DONE]`
    Done,
    /// Terminal in-band error; the boundary renders it and closes
    Error(String),
}

/// Stream of translated client events
pub type ClientEventStream = Pin<Box<dyn Stream<Item = ClientEvent> + Send>>;

/// Translate an upstream line stream into client events
///
/// Heartbeat and analytics events are dropped, web-search results are
/// transmuted into a synthesized content chunk, content deltas are
/// forwarded with rewritten envelope metadata, and malformed lines are
/// logged and skipped. Dropping the returned stream drops the upstream
/// read with it, releasing the connection on client disconnect.
pub fn translate_stream(lines: LineStream, model: String) -> ClientEventStream {
    let completion_id = generate_completion_id();
    let created = unix_timestamp();
    let fingerprint = generate_fingerprint();

    Box::pin(async_stream::stream! {
        let mut lines = lines;
        let mut terminated = false;

        while let Some(item) = lines.next().await {
            match item {
                Ok(payload) => match sse::classify(&payload) {
                    Ok(SseEvent::Done) => {
                        yield ClientEvent::Done;
                        terminated = true;
                        break;
                    }
                    Ok(SseEvent::Heartbeat | SseEvent::Analytics) => {}
                    Ok(SseEvent::WebSearch { sources, model: event_model }) => {
                        yield ClientEvent::Chunk(web_search_chunk(
                            &sources,
                            event_model.as_deref().unwrap_or(DEFAULT_MODEL),
                        ));
                    }
                    Ok(SseEvent::ContentDelta { content }) => {
                        yield ClientEvent::Chunk(content_chunk(
                            content,
                            &completion_id,
                            created,
                            &model,
                            &fingerprint,
                        ));
                    }
                    Ok(SseEvent::Unrecognized) => {
                        debug!("Dropping unrecognized upstream event");
                    }
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed upstream line");
                    }
                },
                Err(e) => {
                    warn!(error = %e, "Upstream stream failed mid-session");
                    yield ClientEvent::Error(e.message);
                    terminated = true;
                    break;
                }
            }
        }

        // Upstream closed without its sentinel; still close out cleanly
        if !terminated {
            yield ClientEvent::Done;
        }
    })
}

/// Aggregate an upstream line stream into one content buffer
///
/// Applies the same classification as streaming mode but accumulates all
/// content-delta text (including synthesized web-search blocks) until the
/// sentinel or end of stream. A transport failure aborts the whole
/// aggregation — there is no partial response to salvage.
pub async fn aggregate_stream(lines: LineStream) -> Result<String, GatewayError> {
    let mut lines = lines;
    let mut buffer = String::new();

    while let Some(item) = lines.next().await {
        match sse::classify(&item?) {
            Ok(SseEvent::Done) => break,
            Ok(SseEvent::Heartbeat | SseEvent::Analytics | SseEvent::Unrecognized) => {}
            Ok(SseEvent::WebSearch { sources, .. }) => {
                buffer.push_str(&sse::sources_block(&sources));
            }
            Ok(SseEvent::ContentDelta { content }) => buffer.push_str(&content),
            Err(e) => warn!(error = %e, "Skipping malformed upstream line"),
        }
    }

    Ok(buffer)
}

/// Build the final chat completion object for non-streaming mode
#[must_use]
pub fn completion_response(
    content: String,
    model: &str,
    images: Vec<InlineImage>,
) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: generate_completion_id(),
        object: "chat.completion",
        created: unix_timestamp(),
        model: model.to_owned(),
        choices: vec![Choice {
            index: 0,
            message: ResponseMessage {
                role: "assistant",
                content,
                images: if images.is_empty() { None } else { Some(images) },
            },
            finish_reason: Some("stop".to_owned()),
        }],
    }
}

/// Forward a content delta, rewriting only envelope metadata
fn content_chunk(
    content: String,
    completion_id: &str,
    created: u64,
    model: &str,
    fingerprint: &str,
) -> ChatCompletionChunk {
    ChatCompletionChunk {
        id: completion_id.to_owned(),
        object: "chat.completion.chunk",
        created,
        model: model.to_owned(),
        system_fingerprint: Some(fingerprint.to_owned()),
        choices: vec![ChunkChoice {
            index: 0,
            delta: Delta {
                role: None,
                content: Some(content),
            },
            finish_reason: None,
        }],
    }
}

/// Synthesize the content chunk replacing a web-search event
///
/// The chunk gets a fresh id and timestamp; the model id is echoed from
/// the triggering event.
fn web_search_chunk(sources: &[String], model: &str) -> ChatCompletionChunk {
    ChatCompletionChunk {
        id: generate_chunk_id(),
        object: "chat.completion.chunk",
        created: unix_timestamp(),
        model: model.to_owned(),
        system_fingerprint: Some(generate_fingerprint()),
        choices: vec![ChunkChoice {
            index: 0,
            delta: Delta {
                role: None,
                content: Some(sse::sources_block(sources)),
            },
            finish_reason: None,
        }],
    }
}

/// Current unix timestamp in seconds
#[must_use]
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Generate a completion identifier
fn generate_completion_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4().simple())
}

/// Generate a bare 24-character chunk identifier
fn generate_chunk_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..24].to_owned()
}

/// Generate a synthetic system fingerprint
fn generate_fingerprint() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("fp_{}", &hex[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_stream(lines: Vec<&str>) -> LineStream {
        let items: Vec<Result<String, GatewayError>> =
            lines.into_iter().map(|l| Ok(l.to_owned())).collect();
        Box::pin(futures::stream::iter(items))
    }

    fn failing_after(lines: Vec<&str>) -> LineStream {
        let mut items: Vec<Result<String, GatewayError>> =
            lines.into_iter().map(|l| Ok(l.to_owned())).collect();
        items.push(Err(GatewayError::upstream_transport("connection reset")));
        Box::pin(futures::stream::iter(items))
    }

    async fn collect(stream: ClientEventStream) -> Vec<ClientEvent> {
        stream.collect().await
    }

    fn chunk_content(event: &ClientEvent) -> Option<&str> {
        match event {
            ClientEvent::Chunk(chunk) => chunk.choices[0].delta.content.as_deref(),
            _ => None,
        }
    }

    #[tokio::test]
    async fn heartbeat_and_analytics_never_reach_the_client() {
        let lines = line_stream(vec![
            r#"{"ping":"1"}"#,
            r#"{"data":{"analytics":{"e":1}}}"#,
            r#"{"choices":[{"delta":{"content":"hi"}}]}"#,
            r#"{"data":{"operation":"x","message":"y"}}"#,
            "[DONE]",
        ]);
        let events = collect(translate_stream(lines, "gpt-4o".to_owned())).await;

        assert_eq!(events.len(), 2);
        assert_eq!(chunk_content(&events[0]), Some("hi"));
        assert!(matches!(events[1], ClientEvent::Done));
    }

    #[tokio::test]
    async fn content_bytes_are_untouched_and_metadata_rewritten() {
        let lines = line_stream(vec![
            r#"{"id":"upstream-id","model":"their-model","choices":[{"delta":{"content":"exact é bytes"}}]}"#,
            "[DONE]",
        ]);
        let events = collect(translate_stream(lines, "claude".to_owned())).await;

        match &events[0] {
            ClientEvent::Chunk(chunk) => {
                assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("exact é bytes"));
                assert_eq!(chunk.model, "claude");
                assert!(chunk.id.starts_with("chatcmpl-"));
                assert!(chunk.system_fingerprint.as_deref().unwrap().starts_with("fp_"));
            }
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn web_search_synthesis_has_exact_shape() {
        let lines = line_stream(vec![
            r#"{"data":{"web":{"sources":[{"url":"a"},{"url":"b"}]}}}"#,
            "[DONE]",
        ]);
        let events = collect(translate_stream(lines, "gpt-4o".to_owned())).await;

        assert_eq!(chunk_content(&events[0]), Some("\na\n\nb\n"));
        match &events[0] {
            ClientEvent::Chunk(chunk) => {
                // No model on the event: default is stamped
                assert_eq!(chunk.model, "gpt-4o");
                assert_eq!(chunk.id.len(), 24);
            }
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn web_search_echoes_event_model() {
        let lines = line_stream(vec![
            r#"{"model":"gpt-4o-mini","data":{"web":{"sources":[{"url":"a"}]}}}"#,
            "[DONE]",
        ]);
        let events = collect(translate_stream(lines, "claude".to_owned())).await;

        match &events[0] {
            ClientEvent::Chunk(chunk) => assert_eq!(chunk.model, "gpt-4o-mini"),
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_line_is_skipped_not_fatal() {
        let lines = line_stream(vec![
            "{broken json",
            r#"{"choices":[{"delta":{"content":"still here"}}]}"#,
            "[DONE]",
        ]);
        let events = collect(translate_stream(lines, "gpt-4o".to_owned())).await;

        assert_eq!(events.len(), 2);
        assert_eq!(chunk_content(&events[0]), Some("still here"));
        assert!(matches!(events[1], ClientEvent::Done));
    }

    #[tokio::test]
    async fn transport_failure_emits_one_terminal_error_last() {
        let lines = failing_after(vec![r#"{"choices":[{"delta":{"content":"partial"}}]}"#]);
        let events = collect(translate_stream(lines, "gpt-4o".to_owned())).await;

        assert_eq!(events.len(), 2);
        assert_eq!(chunk_content(&events[0]), Some("partial"));
        match &events[1] {
            ClientEvent::Error(msg) => assert!(msg.contains("connection reset")),
            other => panic!("expected error terminal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn eof_without_sentinel_still_terminates() {
        let lines = line_stream(vec![r#"{"choices":[{"delta":{"content":"hi"}}]}"#]);
        let events = collect(translate_stream(lines, "gpt-4o".to_owned())).await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], ClientEvent::Done));
    }

    #[tokio::test]
    async fn nothing_after_the_terminal_sentinel() {
        let lines = line_stream(vec![
            "[DONE]",
            r#"{"choices":[{"delta":{"content":"late"}}]}"#,
        ]);
        let events = collect(translate_stream(lines, "gpt-4o".to_owned())).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ClientEvent::Done));
    }

    #[tokio::test]
    async fn translation_is_deterministic_over_the_same_lines() {
        let input = vec![
            r#"{"ping":"1"}"#,
            r#"{"choices":[{"delta":{"content":"a"}}]}"#,
            r#"{"data":{"web":{"sources":[{"url":"s"}]}}}"#,
            r#"{"choices":[{"delta":{"content":"b"}}]}"#,
            "[DONE]",
        ];
        let first = collect(translate_stream(line_stream(input.clone()), "gpt-4o".to_owned())).await;
        let second = collect(translate_stream(line_stream(input), "gpt-4o".to_owned())).await;

        let contents = |events: &[ClientEvent]| -> Vec<Option<String>> {
            events
                .iter()
                .map(|e| chunk_content(e).map(ToOwned::to_owned))
                .collect()
        };
        assert_eq!(contents(&first), contents(&second));
        assert_eq!(first.len(), second.len());
    }

    #[tokio::test]
    async fn aggregate_concatenates_deltas_and_search_blocks() {
        let lines = line_stream(vec![
            r#"{"ping":"1"}"#,
            r#"{"choices":[{"delta":{"content":"Results:"}}]}"#,
            r#"{"data":{"web":{"sources":[{"url":"a"},{"url":"b"}]}}}"#,
            r#"{"choices":[{"delta":{"content":" end"}}]}"#,
            "[DONE]",
        ]);
        let content = aggregate_stream(lines).await.expect("aggregate");
        assert_eq!(content, "Results:\na\n\nb\n end");
    }

    #[tokio::test]
    async fn aggregate_propagates_transport_failure() {
        let lines = failing_after(vec![r#"{"choices":[{"delta":{"content":"x"}}]}"#]);
        let err = aggregate_stream(lines).await.expect_err("should fail");
        assert_eq!(err.kind, crate::types::ErrorKind::UpstreamTransport);
    }

    #[tokio::test]
    async fn completion_response_includes_images_when_present() {
        let resp = completion_response(
            "hello".to_owned(),
            "gpt-4o",
            vec![InlineImage::new("http://localhost/images/a.png")],
        );
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["object"], "chat.completion");
        assert_eq!(json["choices"][0]["finish_reason"], "stop");
        assert_eq!(
            json["choices"][0]["message"]["images"][0]["data"],
            "http://localhost/images/a.png"
        );
    }
}
