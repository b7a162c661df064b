// ABOUTME: Transient asset serving and the root welcome page
// ABOUTME: Streams stored PNGs by sanitized filename; unknown or expired assets are 404
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use tracing::debug;

use crate::state::SharedState;

/// Handle GET /images/{filename}
///
/// Filenames are opaque store-issued names; anything the store refuses
/// to map (traversal attempts included) and anything already swept is a
/// plain 404.
pub async fn serve_image(
    State(state): State<SharedState>,
    Path(filename): Path<String>,
) -> Response {
    let Some(path) = state.store().asset_path(&filename) else {
        debug!(filename = %filename, "Rejected asset name");
        return StatusCode::NOT_FOUND.into_response();
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Handle GET /
pub async fn welcome() -> Html<&'static str> {
    Html(
        "<!DOCTYPE html>\
         <html><head><title>chatbridge</title></head>\
         <body><h1>chatbridge</h1>\
         <p>OpenAI-compatible gateway. Endpoints:</p>\
         <ul>\
         <li><code>POST /v1/chat/completions</code></li>\
         <li><code>POST /v1/images/generations</code></li>\
         <li><code>GET /v1/models</code></li>\
         </ul></body></html>",
    )
}
