//! Stored repository credentials
//!
//! A [`Credential`] is an opaque personal access token. It is only ever sent
//! to the identity endpoint of the service that owns its repository kind.

use std::fmt;
use zeroize::Zeroize;

use super::repository::{RepositoryKind, ServiceKind, GITHUB_TOKEN_PREFIXES};
use crate::error::{ValidationError, ValidationResult};

/// Personal access token for one repository kind
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Validate a token before it is persisted for `kind`.
    ///
    /// GitHub-backed kinds only accept classic (`ghp_`) or fine-grained
    /// (`github_pat_`) tokens; GitLab-backed kinds accept anything.
    pub fn for_kind(kind: RepositoryKind, token: impl Into<String>) -> ValidationResult<Self> {
        let credential = Self::new(token);
        if kind.service() == ServiceKind::GitHub && !credential.has_github_prefix() {
            return Err(ValidationError::InvalidTokenFormat);
        }
        Ok(credential)
    }

    fn has_github_prefix(&self) -> bool {
        GITHUB_TOKEN_PREFIXES
            .iter()
            .any(|prefix| self.0.starts_with(prefix))
    }

    pub fn reveal(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Loggable form: the first four characters followed by a mask
    pub fn redacted(&self) -> String {
        redact_token(&self.0)
    }
}

/// Mask a token for log output
pub fn redact_token(token: &str) -> String {
    if token.is_empty() {
        return "<empty>".to_string();
    }
    let visible: String = token.chars().take(4).collect();
    format!("{}****", visible)
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.redacted()).finish()
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}
