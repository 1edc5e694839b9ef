//! iconbridge Shared Library
//!
//! This crate contains the pieces shared by the privileged controller and the
//! sandboxed UI panel: the repository catalogue, the tagged message protocol
//! both sides speak, the messaging bridge, asset naming, archive packaging and
//! the remote credential verification clients.
//!
//! # Features
//!
//! - **Data Models**: repository kinds, export requests, credentials, node geometry
//! - **Protocol**: closed message enums with a lenient JSON codec
//! - **Bridge**: fire-and-forget channels plus a reference-counted subscription registry
//! - **Naming**: deterministic archive paths for exported assets
//! - **Archive**: deflate-compressed zip packaging
//! - **Verification**: GitHub and GitLab identity checks with a bounded timeout
//!
//! # Usage
//!
//! ```rust
//! use iconbridge_shared::models::{Density, ExportFormat};
//! use iconbridge_shared::utils::naming::raster_path;
//!
//! let path = raster_path("Icon One", 24, true, Density::Mdpi, ExportFormat::Png);
//! assert_eq!(path, "24/drawable-mdpi/icon_one.png");
//! ```

pub mod archive;
pub mod bridge;
pub mod i18n;
pub mod logging;
pub mod models;
pub mod protocol;
pub mod utils;
pub mod verify;

// Re-export commonly used types for convenience
pub use models::{
    Credential, Density, ExportFormat, ExportRequest, NodeGeometry, NodeId, NodeSnapshot,
    RepositoryConfig, RepositoryKind, ServiceKind,
};

pub use protocol::{PanelMessage, RequestId, RequestTarget, UiRequest};

pub use archive::{ArchiveBuilder, ArchiveError, ArchiveResult, PackagedArchive};

pub use verify::{RemoteVerifier, TokenVerifier, VerificationResult};

pub use i18n::{Locale, Message};

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types used throughout the library
pub mod error {
    use thiserror::Error;

    /// Request validation failures, detected before any side effect
    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum ValidationError {
        #[error("No elements are selected")]
        EmptySelection,

        #[error("Raster export requires at least one density")]
        MissingDensities,

        #[error("Expected a GitHub personal access token (ghp_... or github_pat_...)")]
        InvalidTokenFormat,

        #[error("No token is stored for {kind}")]
        MissingCredential { kind: String },

        #[error("JPEG quality must be within [0, 1], got {quality}")]
        QualityOutOfRange { quality: f32 },

        /// A known request type whose body does not decode
        #[error("Malformed {request} request: {reason}")]
        MalformedRequest { request: String, reason: String },
    }

    /// Wire encoding failures
    #[derive(Error, Debug)]
    pub enum ProtocolError {
        #[error("Message serialization failed: {0}")]
        Serialization(#[from] serde_json::Error),
    }

    /// Result type alias for validation checks
    pub type ValidationResult<T> = Result<T, ValidationError>;
}

pub use error::{ProtocolError, ValidationError, ValidationResult};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(VERSION.starts_with(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::MissingCredential {
            kind: "private-icons".to_string(),
        };
        assert!(err.to_string().contains("private-icons"));
        assert!(ValidationError::InvalidTokenFormat
            .to_string()
            .contains("github_pat_"));
    }
}
