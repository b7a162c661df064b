// ABOUTME: Gateway configuration — upstream endpoints, model allow-list, asset store settings
// ABOUTME: Explicit config threaded into components; replaces ambient process-wide state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

use std::path::PathBuf;
use std::time::Duration;

/// Models accepted by the gateway
///
/// The upstream serves a fixed set; anything else is rejected before a
/// request is built.
pub const SUPPORTED_MODELS: &[&str] = &["gpt-4o", "gpt-4o-mini", "claude-3-5-sonnet", "claude"];

/// Model used when a request omits the field, and echoed into synthesized
/// stream chunks that carry no model of their own
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Time-to-live for transient image assets (60 seconds)
const ASSET_TTL_SECS: u64 = 60;

/// Concurrent upstream image-generation attempts per request
const IMAGE_CONCURRENCY: usize = 10;

/// Configuration for the gateway
///
/// One instance is built at startup and shared (via `Arc`) by the
/// normalizer, the transient image store, the upstream client and the
/// image orchestrator. There is no ambient global state.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL clients can reach this gateway at, used to build
    /// self-hosted asset links (e.g. `http://localhost:8080`)
    pub public_base_url: String,
    /// The single upstream chat/stream endpoint
    pub upstream_url: String,
    /// Base URL of the upstream storage-lookup endpoint
    pub storage_url_base: String,
    /// Directory transient image assets are written to
    pub image_dir: PathBuf,
    /// Time-to-live for transient assets
    pub asset_ttl: Duration,
    /// Width of the per-request image attempt limiter
    pub image_concurrency: usize,
}

impl GatewayConfig {
    /// Create a configuration with the given public base URL
    ///
    /// Upstream endpoints and limits start at their fixed defaults.
    #[must_use]
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: trim_trailing_slash(public_base_url.into()),
            upstream_url: "https://api.chaton.ai/chats/stream".to_owned(),
            storage_url_base: "https://api.chaton.ai/storage".to_owned(),
            image_dir: PathBuf::from("images"),
            asset_ttl: Duration::from_secs(ASSET_TTL_SECS),
            image_concurrency: IMAGE_CONCURRENCY,
        }
    }

    /// Override the upstream chat/stream endpoint (used by tests)
    #[must_use]
    pub fn with_upstream_url(mut self, url: impl Into<String>) -> Self {
        self.upstream_url = url.into();
        self
    }

    /// Override the storage-lookup base URL (used by tests)
    #[must_use]
    pub fn with_storage_url_base(mut self, url: impl Into<String>) -> Self {
        self.storage_url_base = trim_trailing_slash(url.into());
        self
    }

    /// Set the transient asset directory
    #[must_use]
    pub fn with_image_dir(mut self, dir: PathBuf) -> Self {
        self.image_dir = dir;
        self
    }

    /// Set the transient asset time-to-live
    #[must_use]
    pub const fn with_asset_ttl(mut self, ttl: Duration) -> Self {
        self.asset_ttl = ttl;
        self
    }

    /// Check a model id against the allow-list
    #[must_use]
    pub fn is_supported_model(model: &str) -> bool {
        SUPPORTED_MODELS.contains(&model)
    }
}

fn trim_trailing_slash(mut s: String) -> String {
    while s.ends_with('/') {
        s.pop();
    }
    s
}

// ============================================================================
// Upstream Client Identity
// ============================================================================

/// Fixed synthetic client identity sent with every upstream call
///
/// The upstream expects requests to look like its own mobile client;
/// these header values come with the protocol, not from the caller.
pub mod identity {
    /// `User-Agent` header value
    pub const USER_AGENT: &str = "ChatOn_Android/1.53.502";
    /// `Client-time-zone` header value
    pub const CLIENT_TIME_ZONE: &str = "-05:00";
    /// `Accept-Language` header value
    pub const ACCEPT_LANGUAGE: &str = "en-US";
    /// `X-Cl-Options` header value
    pub const CL_OPTIONS: &str = "hb";
    /// `Content-Type` header value
    pub const CONTENT_TYPE: &str = "application/json; charset=UTF-8";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_models_accepts_listed() {
        assert!(GatewayConfig::is_supported_model("gpt-4o"));
        assert!(GatewayConfig::is_supported_model("claude"));
        assert!(!GatewayConfig::is_supported_model("gpt-3.5-turbo"));
        assert!(!GatewayConfig::is_supported_model(""));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = GatewayConfig::new("http://localhost:8080/");
        assert_eq!(config.public_base_url, "http://localhost:8080");
    }

    #[test]
    fn defaults_match_protocol_constants() {
        let config = GatewayConfig::new("http://localhost");
        assert_eq!(config.asset_ttl, Duration::from_secs(60));
        assert_eq!(config.image_concurrency, 10);
        assert!(config.upstream_url.ends_with("/chats/stream"));
    }
}
