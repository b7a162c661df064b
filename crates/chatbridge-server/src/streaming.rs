// ABOUTME: Bridges translated client events to an axum Server-Sent Events response
// ABOUTME: Renders chunks as "data: {json}", the terminal sentinel as "data: [DONE]"
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use chatbridge::translate::{ClientEvent, ClientEventStream};
use futures::StreamExt;

/// Convert a translated event stream into an SSE response
///
/// The translator guarantees exactly one terminal event per session, so
/// this layer only renders: chunks become `data: {json}` frames, the
/// terminal sentinel becomes `data: [DONE]`, and an in-band error is
/// serialized in the OpenAI error shape before the connection closes.
/// Client disconnect drops the stream and the upstream read with it.
pub fn sse_response(events: ClientEventStream) -> Response {
    let frames = events.map(|event| {
        let data = match event {
            ClientEvent::Chunk(chunk) => serde_json::to_string(&chunk).unwrap_or_default(),
            ClientEvent::Done => "[DONE]".to_owned(),
            ClientEvent::Error(message) => serde_json::json!({
                "error": {
                    "message": message,
                    "type": "upstream_error"
                }
            })
            .to_string(),
        };
        Ok::<_, Infallible>(Event::default().data(data))
    });

    Sse::new(frames)
        .keep_alive(KeepAlive::default())
        .into_response()
}
