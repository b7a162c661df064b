// ABOUTME: Upstream SSE event parsing and classification
// ABOUTME: Sorts data lines into heartbeat, analytics, web-search, content-delta, done
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

//! # SSE Classification
//!
//! Pure functions over single upstream `data:` payloads. The upstream
//! multiplexes user content with keep-alive pings, analytics beacons and
//! web-search results on one stream; classification decides which of those
//! a payload is, and the translator decides what to do about it.

use serde_json::Value;

use crate::types::GatewayError;

/// Terminal sentinel payload on the upstream stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// SSE line prefix carrying event payloads
const DATA_PREFIX: &str = "data: ";

/// One classified upstream event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Keep-alive marker; dropped
    Heartbeat,
    /// Analytics or operation-only payload with no user content; dropped
    Analytics,
    /// Web-search results to be transmuted into a content chunk
    WebSearch {
        /// Result URLs in upstream order
        sources: Vec<String>,
        /// Model id carried by the event, when present
        model: Option<String>,
    },
    /// User-visible content fragment
    ContentDelta {
        /// Concatenated `choices[].delta.content` text
        content: String,
    },
    /// Upstream terminal sentinel
    Done,
    /// Parsed JSON matching no known shape; carries no client content
    Unrecognized,
}

/// Strip the `data: ` framing from a raw SSE line
///
/// Returns `None` for comment lines, event-name lines and blank
/// separators, which carry nothing the gateway translates.
#[must_use]
pub fn parse_data_line(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX).map(str::trim)
}

/// Classify one upstream payload
///
/// Classification is applied in a fixed order: heartbeat, analytics,
/// web-search, content-delta, unrecognized. A payload that fails JSON
/// parsing is an upstream protocol error the caller logs and skips.
pub fn classify(payload: &str) -> Result<SseEvent, GatewayError> {
    if payload == DONE_SENTINEL {
        return Ok(SseEvent::Done);
    }

    let json: Value = serde_json::from_str(payload)
        .map_err(|e| GatewayError::upstream_protocol(format!("unparseable SSE payload: {e}")))?;

    if json.get("ping").is_some() {
        return Ok(SseEvent::Heartbeat);
    }

    if let Some(data) = json.get("data") {
        if data.get("analytics").is_some() {
            return Ok(SseEvent::Analytics);
        }
        if data.get("operation").is_some() && data.get("message").is_some() {
            return Ok(SseEvent::Analytics);
        }
        if let Some(sources) = data
            .get("web")
            .and_then(|web| web.get("sources"))
            .and_then(Value::as_array)
        {
            let urls = sources
                .iter()
                .filter_map(|s| s.get("url").and_then(Value::as_str))
                .map(ToOwned::to_owned)
                .collect();
            let model = json
                .get("model")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned);
            return Ok(SseEvent::WebSearch {
                sources: urls,
                model,
            });
        }
    }

    if let Some(choices) = json.get("choices").and_then(Value::as_array) {
        let mut content = String::new();
        for choice in choices {
            if let Some(fragment) = choice
                .get("delta")
                .and_then(|d| d.get("content"))
                .and_then(Value::as_str)
            {
                content.push_str(fragment);
            }
        }
        if !content.is_empty() {
            return Ok(SseEvent::ContentDelta { content });
        }
    }

    Ok(SseEvent::Unrecognized)
}

/// Render web-search sources as a content block
///
/// The block is the source URLs joined by blank lines, wrapped in one
/// leading and one trailing newline: `["a", "b"]` → `"\na\n\nb\n"`.
#[must_use]
pub fn sources_block(sources: &[String]) -> String {
    format!("\n{}\n", sources.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_prefix_is_stripped() {
        assert_eq!(parse_data_line("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(parse_data_line("data: [DONE]"), Some("[DONE]"));
        assert_eq!(parse_data_line(": keep-alive"), None);
        assert_eq!(parse_data_line(""), None);
    }

    #[test]
    fn done_sentinel_classifies_as_done() {
        assert_eq!(classify("[DONE]").expect("classify"), SseEvent::Done);
    }

    #[test]
    fn ping_is_heartbeat() {
        let event = classify(r#"{"ping":"2024-01-01T00:00:00Z"}"#).expect("classify");
        assert_eq!(event, SseEvent::Heartbeat);
    }

    #[test]
    fn analytics_payload_is_dropped() {
        let event = classify(r#"{"data":{"analytics":{"event":"turn"}}}"#).expect("classify");
        assert_eq!(event, SseEvent::Analytics);
    }

    #[test]
    fn operation_with_message_is_dropped() {
        let event =
            classify(r#"{"data":{"operation":"thinking","message":"..."}}"#).expect("classify");
        assert_eq!(event, SseEvent::Analytics);
    }

    #[test]
    fn operation_without_message_is_unrecognized() {
        let event = classify(r#"{"data":{"operation":"thinking"}}"#).expect("classify");
        assert_eq!(event, SseEvent::Unrecognized);
    }

    #[test]
    fn web_sources_extracts_urls_and_model() {
        let payload = r#"{
            "model": "gpt-4o-mini",
            "data": {"web": {"sources": [
                {"url": "a", "title": "A"},
                {"url": "b"}
            ]}}
        }"#;
        let event = classify(payload).expect("classify");
        assert_eq!(
            event,
            SseEvent::WebSearch {
                sources: vec!["a".to_owned(), "b".to_owned()],
                model: Some("gpt-4o-mini".to_owned()),
            }
        );
    }

    #[test]
    fn content_delta_concatenates_choices() {
        let payload = r#"{"choices":[
            {"index":0,"delta":{"content":"Hel"}},
            {"index":0,"delta":{"content":"lo"}}
        ]}"#;
        let event = classify(payload).expect("classify");
        assert_eq!(
            event,
            SseEvent::ContentDelta {
                content: "Hello".to_owned()
            }
        );
    }

    #[test]
    fn delta_without_content_is_unrecognized() {
        let event = classify(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).expect("classify");
        assert_eq!(event, SseEvent::Unrecognized);
    }

    #[test]
    fn bad_json_is_a_protocol_error() {
        let err = classify("{not json").expect_err("should fail");
        assert_eq!(err.kind, crate::types::ErrorKind::UpstreamProtocol);
    }

    #[test]
    fn sources_block_matches_exact_shape() {
        let block = sources_block(&["a".to_owned(), "b".to_owned()]);
        assert_eq!(block, "\na\n\nb\n");

        let single = sources_block(&["only".to_owned()]);
        assert_eq!(single, "\nonly\n");
    }
}
