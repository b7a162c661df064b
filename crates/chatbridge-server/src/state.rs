// ABOUTME: Server state bundling gateway config, transient image store, and upstream client
// ABOUTME: Built once at startup and shared across handlers; no mutable per-request state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

use std::sync::Arc;

use chatbridge::config::GatewayConfig;
use chatbridge::signing::SharedSigner;
use chatbridge::store::ImageStore;
use chatbridge::upstream::UpstreamClient;

/// Shared server state handle
pub type SharedState = Arc<ServerState>;

/// Immutable server state shared by all handlers
///
/// Holds the one configuration, the transient image store rooted at the
/// configured asset directory, and the signed upstream client. Handlers
/// never mutate state; anything per-request lives on the request path.
pub struct ServerState {
    config: Arc<GatewayConfig>,
    store: ImageStore,
    client: UpstreamClient,
}

impl ServerState {
    /// Build server state from a configuration and a signing capability
    pub fn new(config: Arc<GatewayConfig>, signer: SharedSigner) -> Self {
        let store = ImageStore::new(
            config.image_dir.clone(),
            config.asset_ttl,
            config.public_base_url.clone(),
        );
        let client = UpstreamClient::new(Arc::clone(&config), signer);
        Self {
            config,
            store,
            client,
        }
    }

    /// The gateway configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The transient image store
    pub const fn store(&self) -> &ImageStore {
        &self.store
    }

    /// The signed upstream client
    pub const fn client(&self) -> &UpstreamClient {
        &self.client
    }
}
