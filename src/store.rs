// ABOUTME: Transient image store — persists time-boxed assets, sweeps expired ones on write
// ABOUTME: Unique uuid filenames, best-effort deletion, URL resolution from configured base
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::GatewayError;

/// Persists short-lived image assets under a single directory
///
/// Writes use fresh uuid filenames, so the directory is safely shared
/// across concurrent requests without locking. Every write first sweeps
/// assets older than the TTL; the sweep and the write are not
/// transactional, so a reader racing a deletion may see a 404. That is an
/// accepted trade-off for a cache whose contents live for one minute.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    ttl: Duration,
    public_base_url: String,
}

impl ImageStore {
    /// Create a store writing to `dir` with the given TTL
    ///
    /// `public_base_url` is the externally reachable base used by
    /// [`resolve`](Self::resolve); the directory is created on first write.
    #[must_use]
    pub fn new(dir: PathBuf, ttl: Duration, public_base_url: impl Into<String>) -> Self {
        Self {
            dir,
            ttl,
            public_base_url: public_base_url.into(),
        }
    }

    /// Persist image bytes as a fresh asset, returning its filename
    ///
    /// Always creates a new file — no content-addressed dedup; persisting
    /// the same bytes twice yields two assets. Expired assets are swept
    /// before the write.
    pub async fn persist(&self, bytes: &[u8]) -> Result<String, GatewayError> {
        self.sweep_expired().await;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| GatewayError::internal(format!("failed to create asset dir: {e}")))?;

        let filename = format!("{}.png", Uuid::new_v4());
        let path = self.dir.join(&filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| GatewayError::internal(format!("failed to write asset: {e}")))?;

        debug!(filename = %filename, bytes = bytes.len(), "Persisted transient asset");
        Ok(filename)
    }

    /// Build the externally reachable URL for a stored asset
    #[must_use]
    pub fn resolve(&self, filename: &str) -> String {
        format!("{}/images/{}", self.public_base_url, filename)
    }

    /// Resolve a client-supplied filename to an on-disk path
    ///
    /// Rejects anything that is not a bare filename, so the static asset
    /// route cannot be used to walk out of the store directory.
    #[must_use]
    pub fn asset_path(&self, filename: &str) -> Option<PathBuf> {
        if filename.is_empty() || filename.contains('/') || filename.contains("..") {
            return None;
        }
        Some(self.dir.join(filename))
    }

    /// Directory assets are written to
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Delete assets older than the TTL
    ///
    /// Best-effort: unreadable entries and failed deletions are logged and
    /// skipped, never propagated.
    async fn sweep_expired(&self) {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            // Nothing to sweep before the first write
            Err(_) => return,
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let expired = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified
                    .elapsed()
                    .map(|age| age > self.ttl)
                    .unwrap_or(false),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Could not stat asset");
                    false
                }
            };

            if expired {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => debug!(path = %path.display(), "Deleted expired asset"),
                    Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete expired asset"),
                }
            }
        }
    }
}
