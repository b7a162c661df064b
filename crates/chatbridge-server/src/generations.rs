// ABOUTME: POST /v1/images/generations handler for OpenAI-compatible batch image generation
// ABOUTME: Validates prompt and model, then runs the wave-based batch orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chatbridge::config::GatewayConfig;
use chatbridge::images::{self, ResponseFormat};
use chatbridge::openai::{ImageGenerationRequest, ImageGenerationResponse};
use chatbridge::translate::unix_timestamp;
use tracing::debug;

use crate::completions::{error_response, gateway_error_to_response};
use crate::state::SharedState;

/// Handle POST /v1/images/generations
///
/// The upstream renders with a fixed model and aspect regardless of what
/// the client asks for; `model` is still validated against the allow-list
/// and `size` is accepted and ignored.
pub async fn handle(State(state): State<SharedState>, body: String) -> Response {
    let request: ImageGenerationRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &format!("invalid JSON: {e}")),
    };

    let prompt = request.prompt.as_deref().map(str::trim).unwrap_or("");
    if prompt.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "prompt is required");
    }

    if let Some(model) = request.model.as_deref() {
        if !GatewayConfig::is_supported_model(model) {
            return error_response(StatusCode::BAD_REQUEST, &format!("Unsupported model: {model}"));
        }
    }

    let n = request.n.unwrap_or(1).max(1) as usize;
    let format = ResponseFormat::parse(request.response_format.as_deref());
    debug!(n, ?format, "Dispatching image batch");

    match images::generate_batch(
        state.client(),
        prompt,
        n,
        format,
        state.config().image_concurrency,
    )
    .await
    {
        Ok(data) => {
            let response = ImageGenerationResponse {
                created: unix_timestamp(),
                data,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => gateway_error_to_response(&e),
    }
}
