// ABOUTME: Request-signing capability — opaque sign(payload) -> (authorization, date)
// ABOUTME: Trait seam plus a helper-binary implementation; signing internals live elsewhere
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout as tokio_timeout;
use tracing::warn;

use crate::types::GatewayError;

/// Time allowed for one signing invocation
const SIGN_TIMEOUT: Duration = Duration::from_secs(10);

/// A signed token pair for one upstream request
#[derive(Debug, Clone)]
pub struct SignedToken {
    /// Value for the `Authorization` header
    pub authorization: String,
    /// Value for the `Date` header, formatted by the signer
    pub date: String,
}

/// Capability interface for the opaque request signer
///
/// The gateway never implements signing itself; it hands the exact bytes
/// of the outbound payload to this capability and receives an
/// authorization token plus the timestamp it was computed over, or a
/// failure. Failures surface to clients as an opaque auth error.
#[async_trait]
pub trait TokenSigner: Send + Sync {
    /// Sign the given upstream payload
    async fn sign(&self, payload: &str) -> Result<SignedToken, GatewayError>;
}

/// Shared signer handle
pub type SharedSigner = Arc<dyn TokenSigner>;

/// Signer that delegates to an external helper binary
///
/// The helper receives the payload on stdin and prints two lines:
/// the `Authorization` value and the `Date` value. Anything else —
/// non-zero exit, missing lines, spawn failure — is an auth failure.
/// Helper stderr is logged but never forwarded to clients.
pub struct HelperSigner {
    helper_path: PathBuf,
}

impl HelperSigner {
    /// Create a signer invoking the helper at the given path
    #[must_use]
    pub const fn new(helper_path: PathBuf) -> Self {
        Self { helper_path }
    }
}

#[async_trait]
impl TokenSigner for HelperSigner {
    async fn sign(&self, payload: &str) -> Result<SignedToken, GatewayError> {
        let mut child = Command::new(&self.helper_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                warn!(helper = %self.helper_path.display(), error = %e, "Failed to spawn token helper");
                GatewayError::auth_failure("token generation failed")
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if stdin.write_all(payload.as_bytes()).await.is_err() {
                let _ = child.start_kill();
                return Err(GatewayError::auth_failure("token generation failed"));
            }
            // Close stdin so the helper sees EOF
            drop(stdin);
        }

        let output = match tokio_timeout(SIGN_TIMEOUT, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(error = %e, "Token helper I/O failure");
                return Err(GatewayError::auth_failure("token generation failed"));
            }
            Err(_) => {
                warn!("Token helper timed out");
                return Err(GatewayError::auth_failure("token generation failed"));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(exit = ?output.status.code(), stderr = %stderr, "Token helper failed");
            return Err(GatewayError::auth_failure("token generation failed"));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = stdout.lines();
        match (lines.next(), lines.next()) {
            (Some(authorization), Some(date)) if !authorization.is_empty() && !date.is_empty() => {
                Ok(SignedToken {
                    authorization: authorization.to_owned(),
                    date: date.to_owned(),
                })
            }
            _ => {
                warn!("Token helper produced malformed output");
                Err(GatewayError::auth_failure("token generation failed"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    /// Signer returning a fixed token, for exercising callers in tests
    pub(crate) struct StaticSigner;

    #[async_trait]
    impl TokenSigner for StaticSigner {
        async fn sign(&self, _payload: &str) -> Result<SignedToken, GatewayError> {
            Ok(SignedToken {
                authorization: "Bearer test-token".to_owned(),
                date: "Wed, 01 Jan 2025 00:00:00 GMT".to_owned(),
            })
        }
    }

    #[tokio::test]
    async fn static_signer_signs() {
        let signer = StaticSigner;
        let token = signer.sign("{}").await.expect("sign");
        assert_eq!(token.authorization, "Bearer test-token");
        assert!(!token.date.is_empty());
    }

    #[tokio::test]
    async fn missing_helper_is_an_opaque_auth_failure() {
        let signer = HelperSigner::new(PathBuf::from("/nonexistent/token-helper"));
        let err = signer.sign("{}").await.expect_err("should fail");
        assert_eq!(err.kind, ErrorKind::AuthFailure);
        // The helper path must not leak into the message
        assert!(!err.message.contains("nonexistent"));
    }
}
