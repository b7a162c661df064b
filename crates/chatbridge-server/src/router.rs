// ABOUTME: Axum router wiring all REST endpoints for the OpenAI-compatible gateway
// ABOUTME: Mounts completions, image generations, models, transient assets, and the welcome page
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

use axum::routing::{get, post};
use axum::Router;

use crate::assets;
use crate::completions;
use crate::generations;
use crate::models;
use crate::state::SharedState;

/// Build the application router with all endpoints
///
/// Routes:
/// - `POST /v1/chat/completions` — Chat completion (streaming and non-streaming)
/// - `POST /v1/images/generations` — Batch image generation
/// - `GET /v1/models` — List supported models
/// - `GET /images/{filename}` — Transient image assets
/// - `GET /` — Welcome page
pub fn build(state: SharedState) -> Router {
    Router::new()
        .route("/", get(assets::welcome))
        .route("/v1/chat/completions", post(completions::handle))
        .route("/v1/images/generations", post(generations::handle))
        .route("/v1/models", get(models::handle))
        .route("/images/{filename}", get(assets::serve_image))
        .with_state(state)
}
