// ABOUTME: POST /v1/chat/completions handler for OpenAI-compatible chat completion
// ABOUTME: Normalizes the request, drives the upstream stream, streams SSE or aggregates JSON
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chatbridge::normalize;
use chatbridge::openai::{ChatCompletionRequest, ErrorResponse};
use chatbridge::translate;
use chatbridge::types::{ErrorKind, GatewayError};
use chatbridge::upstream::ChatEnvelope;
use tracing::{debug, error};

use crate::state::SharedState;
use crate::streaming;

/// Handle POST /v1/chat/completions
///
/// The body is parsed by hand so malformed JSON maps to a 400 with an
/// OpenAI-shaped error body rather than the extractor's default reject.
pub async fn handle(State(state): State<SharedState>, body: String) -> Response {
    let request: ChatCompletionRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &format!("invalid JSON: {e}")),
    };

    let normalized = match normalize::normalize_request(&request, state.store()).await {
        Ok(normalized) => normalized,
        Err(e) => return gateway_error_to_response(&e),
    };
    debug!(
        model = %normalized.model,
        messages = normalized.messages.len(),
        stream = normalized.stream,
        "Dispatching completion"
    );

    let envelope = ChatEnvelope::from_request(&normalized);
    let lines = match state.client().stream_envelope(&envelope).await {
        Ok(lines) => lines,
        Err(e) => return gateway_error_to_response(&e),
    };

    if normalized.stream {
        let events = translate::translate_stream(lines, normalized.model);
        streaming::sse_response(events)
    } else {
        match translate::aggregate_stream(lines).await {
            Ok(content) => {
                let response = translate::completion_response(
                    content,
                    &normalized.model,
                    normalized.inline_images(),
                );
                (StatusCode::OK, Json(response)).into_response()
            }
            Err(e) => gateway_error_to_response(&e),
        }
    }
}

/// Map a `GatewayError` to an HTTP status and `OpenAI` error response
///
/// Only client mistakes are 400; everything that goes wrong on the
/// gateway's side of the fence, signing included, is a 500.
pub fn gateway_error_to_response(err: &GatewayError) -> Response {
    let (status, error_type) = match err.kind {
        ErrorKind::InvalidRequest => (StatusCode::BAD_REQUEST, "invalid_request_error"),
        ErrorKind::AuthFailure => (StatusCode::INTERNAL_SERVER_ERROR, "authentication_error"),
        ErrorKind::UpstreamTransport | ErrorKind::UpstreamProtocol => {
            (StatusCode::INTERNAL_SERVER_ERROR, "upstream_error")
        }
        ErrorKind::Exhausted | ErrorKind::Internal => {
            (StatusCode::INTERNAL_SERVER_ERROR, "server_error")
        }
    };

    error!(kind = ?err.kind, message = %err.message, "Gateway error");
    let body = ErrorResponse::new(error_type, &err.message);
    (status, Json(body)).into_response()
}

/// Build an error response with a given status and message
pub fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorResponse::new("invalid_request_error", message);
    (status, Json(body)).into_response()
}
