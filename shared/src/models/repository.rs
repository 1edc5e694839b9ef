//! The fixed repository catalogue
//!
//! Every [`RepositoryKind`] maps statically to exactly one
//! [`RepositoryConfig`]. The mapping is total and never changes at runtime.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// One of the three logical image repositories
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum RepositoryKind {
    /// Public icon library hosted on GitHub
    #[default]
    PublicIcons,
    /// Private icon library hosted on GitLab
    PrivateIcons,
    /// Internal image library hosted on GitLab
    InternalImages,
}

/// The remote service a repository lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    GitHub,
    GitLab,
}

/// Static location of a repository on its remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryConfig {
    GitHub {
        /// Web host, used for token creation links
        web_base: &'static str,
        /// REST API root
        api_base: &'static str,
        owner: &'static str,
        repo: &'static str,
    },
    GitLab {
        /// Instance root; the REST API lives under `/api/v4`
        base_url: &'static str,
        project_path: &'static str,
    },
}

const GITHUB_WEB: &str = "https://github.com";
const GITHUB_API: &str = "https://api.github.com";
const GITLAB_BASE: &str = "https://gitlab.mvk.com";

/// Prefixes accepted for GitHub personal access tokens
pub const GITHUB_TOKEN_PREFIXES: [&str; 2] = ["ghp_", "github_pat_"];

impl RepositoryKind {
    /// Every kind, in catalogue order
    pub const ALL: [RepositoryKind; 3] = [
        RepositoryKind::PublicIcons,
        RepositoryKind::PrivateIcons,
        RepositoryKind::InternalImages,
    ];

    /// Wire identifier (`public-icons`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryKind::PublicIcons => "public-icons",
            RepositoryKind::PrivateIcons => "private-icons",
            RepositoryKind::InternalImages => "internal-images",
        }
    }

    /// Parse a wire identifier, falling back to the default kind
    pub fn parse_or_default(value: &str) -> RepositoryKind {
        value.parse().unwrap_or_else(|_| {
            warn!(
                "Unrecognized repository kind {:?}, falling back to {}",
                value,
                RepositoryKind::default()
            );
            RepositoryKind::default()
        })
    }

    /// Storage slot holding this repository's credential
    pub fn token_storage_key(&self) -> &'static str {
        match self {
            RepositoryKind::PublicIcons => "token_public_icons",
            RepositoryKind::PrivateIcons => "token_private_icons",
            RepositoryKind::InternalImages => "token_internal_images",
        }
    }

    pub fn config(&self) -> RepositoryConfig {
        match self {
            RepositoryKind::PublicIcons => RepositoryConfig::GitHub {
                web_base: GITHUB_WEB,
                api_base: GITHUB_API,
                owner: "VKCOM",
                repo: "icons",
            },
            RepositoryKind::PrivateIcons => RepositoryConfig::GitLab {
                base_url: GITLAB_BASE,
                project_path: "design/icons-private",
            },
            RepositoryKind::InternalImages => RepositoryConfig::GitLab {
                base_url: GITLAB_BASE,
                project_path: "design/images",
            },
        }
    }

    pub fn service(&self) -> ServiceKind {
        self.config().service()
    }

    /// Human readable label for selectors
    pub fn label(&self) -> &'static str {
        match self {
            RepositoryKind::PublicIcons => "Public icons (GitHub VKCOM/icons)",
            RepositoryKind::PrivateIcons => "Private icons (GitLab icons-private)",
            RepositoryKind::InternalImages => "Internal images (GitLab images)",
        }
    }

    /// Hint shown in an empty token input
    pub fn token_placeholder(&self) -> &'static str {
        match self.service() {
            ServiceKind::GitHub => "github_pat_... or ghp_...",
            ServiceKind::GitLab => "GitLab Private-Token",
        }
    }
}

impl RepositoryConfig {
    pub fn service(&self) -> ServiceKind {
        match self {
            RepositoryConfig::GitHub { .. } => ServiceKind::GitHub,
            RepositoryConfig::GitLab { .. } => ServiceKind::GitLab,
        }
    }

    /// Page where the user can create a personal access token
    pub fn token_settings_url(&self) -> String {
        match self {
            RepositoryConfig::GitHub { web_base, .. } => {
                format!("{}/settings/tokens?type=pat", web_base)
            }
            RepositoryConfig::GitLab { base_url, .. } => format!(
                "{}/-/user_settings/personal_access_tokens",
                base_url.trim_end_matches('/')
            ),
        }
    }

    /// `owner/repo` or the GitLab project path
    pub fn display_path(&self) -> String {
        match self {
            RepositoryConfig::GitHub { owner, repo, .. } => format!("{}/{}", owner, repo),
            RepositoryConfig::GitLab { project_path, .. } => project_path.to_string(),
        }
    }
}

impl fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::GitHub => write!(f, "GitHub"),
            ServiceKind::GitLab => write!(f, "GitLab"),
        }
    }
}

/// Error returned when a string is not a known repository identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown repository kind: {0}")]
pub struct UnknownRepositoryKind(pub String);

impl FromStr for RepositoryKind {
    type Err = UnknownRepositoryKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepositoryKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownRepositoryKind(s.to_string()))
    }
}

/// Deserialize a repository kind, substituting the default kind for anything
/// unrecognized instead of failing the whole message.
pub fn deserialize_kind_or_default<'de, D>(deserializer: D) -> Result<RepositoryKind, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw.as_str() {
        Some(value) => RepositoryKind::parse_or_default(value),
        None => {
            warn!("Repository kind is not a string ({}), using default", raw);
            RepositoryKind::default()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_wire_id() {
        for kind in RepositoryKind::ALL {
            assert_eq!(kind.as_str().parse::<RepositoryKind>().unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_unknown_kind_falls_back_to_default() {
        assert_eq!(
            RepositoryKind::parse_or_default("not-a-repo"),
            RepositoryKind::PublicIcons
        );
        assert!("".parse::<RepositoryKind>().is_err());
    }

    #[test]
    fn test_mapping_is_total() {
        assert_eq!(RepositoryKind::PublicIcons.service(), ServiceKind::GitHub);
        assert_eq!(RepositoryKind::PrivateIcons.service(), ServiceKind::GitLab);
        assert_eq!(RepositoryKind::InternalImages.service(), ServiceKind::GitLab);

        let keys: Vec<_> = RepositoryKind::ALL
            .iter()
            .map(|k| k.token_storage_key())
            .collect();
        assert_eq!(
            keys,
            vec![
                "token_public_icons",
                "token_private_icons",
                "token_internal_images"
            ]
        );
    }

    #[test]
    fn test_token_settings_urls() {
        assert_eq!(
            RepositoryKind::PublicIcons.config().token_settings_url(),
            "https://github.com/settings/tokens?type=pat"
        );
        assert_eq!(
            RepositoryKind::InternalImages.config().token_settings_url(),
            "https://gitlab.mvk.com/-/user_settings/personal_access_tokens"
        );
        assert_eq!(
            RepositoryKind::PrivateIcons.config().display_path(),
            "design/icons-private"
        );
    }

    #[test]
    fn test_lenient_deserialization() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(deserialize_with = "deserialize_kind_or_default")]
            kind: RepositoryKind,
        }

        let ok: Holder = serde_json::from_str(r#"{"kind":"internal-images"}"#).unwrap();
        assert_eq!(ok.kind, RepositoryKind::InternalImages);

        let fallback: Holder = serde_json::from_str(r#"{"kind":"bogus"}"#).unwrap();
        assert_eq!(fallback.kind, RepositoryKind::PublicIcons);

        let numeric: Holder = serde_json::from_str(r#"{"kind":42}"#).unwrap();
        assert_eq!(numeric.kind, RepositoryKind::PublicIcons);
    }
}
