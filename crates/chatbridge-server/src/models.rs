// ABOUTME: GET /v1/models handler listing the gateway's fixed model allow-list
// ABOUTME: Returns the supported model ids in OpenAI list format
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chatbridge::config::SUPPORTED_MODELS;
use chatbridge::openai::{ModelObject, ModelsResponse};

/// Handle GET /v1/models
///
/// The upstream serves a fixed set of models, so the list is static.
pub async fn handle() -> impl IntoResponse {
    let data = SUPPORTED_MODELS
        .iter()
        .map(|&id| ModelObject {
            id: id.to_owned(),
            object: "model",
            owned_by: "system",
        })
        .collect();

    let resp = ModelsResponse {
        object: "list",
        data,
    };

    (StatusCode::OK, Json(resp))
}
