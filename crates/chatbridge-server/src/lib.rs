// ABOUTME: Library root re-exporting server modules for integration testing
// ABOUTME: Enables tests/ to access router, state, and handler modules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

pub mod assets;
pub mod completions;
pub mod generations;
pub mod models;
pub mod router;
pub mod state;
pub mod streaming;
