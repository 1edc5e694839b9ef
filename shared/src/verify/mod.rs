//! Remote credential verification
//!
//! Each repository kind is backed by exactly one service. Verification asks
//! that service's identity endpoint who the token belongs to:
//!
//! | service | endpoint | auth header |
//! |---|---|---|
//! | GitHub | `GET {api_base}/user` | `Authorization: Bearer <token>` |
//! | GitLab | `GET {base_url}/api/v4/user` | `Private-Token: <token>` |
//!
//! Every outcome, including transport failures and timeouts, is folded into
//! a [`VerificationResult`]; callers never see an `Err`.

pub mod github;
pub mod gitlab;

pub use github::GitHubVerifier;
pub use gitlab::GitLabVerifier;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{redact_token, RepositoryConfig, RepositoryKind};

/// Upper bound on one identity request, connect through body
pub const VERIFICATION_TIMEOUT: Duration = Duration::from_secs(12);

/// User agent sent with identity requests; GitHub rejects requests without one
pub const DEFAULT_USER_AGENT: &str = concat!("iconbridge/", env!("CARGO_PKG_VERSION"));

/// Who a verified token belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub display_name: String,
}

/// Uniform outcome of a verification attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub ok: bool,
    /// HTTP status, or 0 when no response was received
    pub status: u16,
    /// Present only when `ok`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationResult {
    pub fn success(status: u16, display_name: impl Into<String>) -> Self {
        Self {
            ok: true,
            status,
            data: Some(Identity {
                display_name: display_name.into(),
            }),
            error: None,
        }
    }

    pub fn failure(status: u16, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            status,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.display_name.as_str())
    }

    /// User-facing failure text: the error (or `fallback`) with the status
    /// appended in parentheses when one was received.
    pub fn describe_failure(&self, fallback: &str) -> String {
        let error = self
            .error
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(fallback);
        if self.status > 0 {
            format!("{} ({})", error, self.status)
        } else {
            error.to_string()
        }
    }
}

/// Failures that never produced an HTTP status
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("{0}")]
    Transport(reqwest::Error),

    #[error("Unexpected identity response: {0}")]
    Decode(reqwest::Error),
}

/// Verifies a token against the service that owns a repository kind
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, kind: RepositoryKind, token: &str) -> VerificationResult;
}

#[async_trait]
impl<T: TokenVerifier + ?Sized> TokenVerifier for std::sync::Arc<T> {
    async fn verify(&self, kind: RepositoryKind, token: &str) -> VerificationResult {
        (**self).verify(kind, token).await
    }
}

/// One identity-check strategy per remote service
#[async_trait]
pub trait IdentityCheck: Send + Sync {
    async fn check(&self, token: &str) -> VerificationResult;
}

/// Verifier backed by the real GitHub and GitLab APIs
#[derive(Clone)]
pub struct RemoteVerifier {
    client: reqwest::Client,
    timeout: Duration,
}

impl RemoteVerifier {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build configured HTTP client ({}), using defaults", e);
                reqwest::Client::new()
            });

        Self { client, timeout }
    }

    fn checker_for(&self, config: RepositoryConfig) -> Box<dyn IdentityCheck> {
        match config {
            RepositoryConfig::GitHub { api_base, .. } => Box::new(GitHubVerifier::new(
                self.client.clone(),
                api_base,
                self.timeout,
            )),
            RepositoryConfig::GitLab { base_url, .. } => Box::new(GitLabVerifier::new(
                self.client.clone(),
                base_url,
                self.timeout,
            )),
        }
    }
}

impl Default for RemoteVerifier {
    fn default() -> Self {
        Self::new(VERIFICATION_TIMEOUT, DEFAULT_USER_AGENT)
    }
}

#[async_trait]
impl TokenVerifier for RemoteVerifier {
    async fn verify(&self, kind: RepositoryKind, token: &str) -> VerificationResult {
        if token.is_empty() {
            return VerificationResult::failure(0, "Token is not set");
        }

        let config = kind.config();
        info!(
            "Verifying {} token {} against {}",
            kind,
            redact_token(token),
            config.service()
        );
        let result = self.checker_for(config).check(token).await;
        debug!("Verification for {} finished with status {}", kind, result.status);
        result
    }
}

enum Exchange<T> {
    Accepted(u16, T),
    Rejected(u16, String),
}

async fn exchange<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<Exchange<T>, VerificationError> {
    let response = request.send().await.map_err(VerificationError::Transport)?;
    let status = response.status().as_u16();

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        return Ok(Exchange::Rejected(status, body));
    }

    let body = response.json::<T>().await.map_err(VerificationError::Decode)?;
    Ok(Exchange::Accepted(status, body))
}

/// Run one identity request under `timeout`.
///
/// Dropping the request future on timeout cancels the in-flight call, and the
/// timer goes away with it whichever side settles first.
pub(crate) async fn run_check<T, F>(
    request: reqwest::RequestBuilder,
    url: &str,
    timeout: Duration,
    fallback: &str,
    display_name: F,
) -> VerificationResult
where
    T: DeserializeOwned,
    F: FnOnce(T) -> String,
{
    match tokio::time::timeout(timeout, exchange::<T>(request)).await {
        Err(_) => {
            let error = VerificationError::Timeout {
                url: url.to_string(),
            };
            warn!("{}", error);
            VerificationResult::failure(0, error.to_string())
        }
        Ok(Err(error)) => {
            warn!("Identity request to {} failed: {}", url, error);
            VerificationResult::failure(0, error.to_string())
        }
        Ok(Ok(Exchange::Rejected(status, body))) => {
            let error = if body.trim().is_empty() {
                fallback.to_string()
            } else {
                body
            };
            VerificationResult::failure(status, error)
        }
        Ok(Ok(Exchange::Accepted(status, identity))) => {
            VerificationResult::success(status, display_name(identity))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_failure() {
        let result = VerificationResult::failure(401, "Bad credentials");
        assert_eq!(result.describe_failure("fallback"), "Bad credentials (401)");

        let result = VerificationResult::failure(0, "");
        assert_eq!(result.describe_failure("Verification failed"), "Verification failed");
    }

    #[test]
    fn test_success_shape() {
        let result = VerificationResult::success(200, "octocat");
        assert!(result.ok);
        assert_eq!(result.display_name(), Some("octocat"));
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"{"ok":true,"status":200,"data":{"displayName":"octocat"}}"#
        );
    }

    #[tokio::test]
    async fn test_empty_token_short_circuits() {
        let verifier = RemoteVerifier::default();
        for kind in RepositoryKind::ALL {
            let result = verifier.verify(kind, "").await;
            assert!(!result.ok);
            assert_eq!(result.status, 0);
        }
    }
}
