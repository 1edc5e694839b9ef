//! GitHub identity check

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use std::time::Duration;

use super::{run_check, IdentityCheck, VerificationResult};

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const FALLBACK_ERROR: &str = "GitHub token check failed";

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

pub struct GitHubVerifier {
    client: reqwest::Client,
    api_base: String,
    timeout: Duration,
}

impl GitHubVerifier {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            timeout,
        }
    }

    fn user_url(&self) -> String {
        format!("{}/user", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl IdentityCheck for GitHubVerifier {
    async fn check(&self, token: &str) -> VerificationResult {
        if token.is_empty() {
            return VerificationResult::failure(0, "Token is not set");
        }

        let url = self.user_url();
        let request = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(ACCEPT, GITHUB_MEDIA_TYPE);

        run_check(request, &url, self.timeout, FALLBACK_ERROR, |user: GitHubUser| {
            user.login
        })
        .await
    }
}
