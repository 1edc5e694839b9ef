//! GitLab identity check

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{run_check, IdentityCheck, VerificationResult};

const PRIVATE_TOKEN_HEADER: &str = "Private-Token";
const FALLBACK_ERROR: &str = "GitLab token check failed";

#[derive(Debug, Deserialize)]
struct GitLabUser {
    username: String,
}

pub struct GitLabVerifier {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl GitLabVerifier {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Identity endpoint; trailing slashes on the instance URL are ignored
    pub fn user_url(&self) -> String {
        format!("{}/api/v4/user", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl IdentityCheck for GitLabVerifier {
    async fn check(&self, token: &str) -> VerificationResult {
        if token.is_empty() {
            return VerificationResult::failure(0, "Token is not set");
        }

        let url = self.user_url();
        let request = self
            .client
            .get(&url)
            .header(PRIVATE_TOKEN_HEADER, token);

        run_check(request, &url, self.timeout, FALLBACK_ERROR, |user: GitLabUser| {
            user.username
        })
        .await
    }
}
