//! Error types for the iconbridge controller
//!
//! Every request handler returns a [`ControllerResult`]. The dispatch
//! boundary turns an `Err` into a localized `error` message through
//! [`UserFriendlyError`], so no handler failure ever reaches the run loop.

use std::fmt;
use thiserror::Error;
use tracing::debug;

use iconbridge_shared::{ArchiveError, Locale, Message, NodeId, ValidationError};

/// Error raised while handling one inbound request
#[derive(Error, Debug)]
pub enum ControllerError {
    /// Request rejected before any side effect
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Persistent storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Document export or packaging failed; the whole batch is discarded
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Remote verification did not succeed; `message` is already user-facing
    #[error("Verification failed: {message}")]
    Verification { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Storage gateway errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage file {path} is corrupted: {reason}")]
    Corrupted { path: String, reason: String },

    #[error("Storage is unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Storage serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage IO failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a document host
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Node {node} does not support export")]
    NotExportable { node: NodeId },

    #[error("Node {node} is no longer part of the document")]
    NodeNotFound { node: NodeId },

    #[error("Rendering node {node} failed: {reason}")]
    Render { node: NodeId, reason: String },

    #[error("Host IO failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Export pipeline errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    NotFound { path: String },

    #[error("Invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("Configuration parsing failed: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration IO failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for request handlers
pub type ControllerResult<T> = Result<T, ControllerError>;

pub type StorageResult<T> = Result<T, StorageError>;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Trait for converting errors to user-friendly messages
pub trait UserFriendlyError {
    /// Localized message safe to show to users
    /// (without exposing internal implementation details)
    fn user_message(&self, locale: Locale) -> String;

    /// Get the error category for logging
    fn category(&self) -> ErrorCategory;
}

/// Error categories for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Storage,
    Network,
    Validation,
    Export,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Storage => write!(f, "storage"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Export => write!(f, "export"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

impl UserFriendlyError for ControllerError {
    fn user_message(&self, locale: Locale) -> String {
        match self {
            ControllerError::Validation(error) => locale.render(&Message::Validation(error)),
            ControllerError::Storage(_) => locale.render(&Message::StorageUnavailable),
            ControllerError::Export(ExportError::Host(HostError::NotExportable { .. })) => {
                locale.render(&Message::NodeNotExportable)
            }
            ControllerError::Export(ExportError::Host(HostError::Render { node, reason })) => {
                debug!("Render failure on {}: {}", node, reason);
                locale.render(&Message::RenderFailed)
            }
            ControllerError::Export(_) => locale.render(&Message::Internal),
            ControllerError::Verification { message } => message.clone(),
            ControllerError::Internal { .. } => locale.render(&Message::Internal),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            ControllerError::Validation(_) => ErrorCategory::Validation,
            ControllerError::Storage(_) => ErrorCategory::Storage,
            ControllerError::Export(_) => ErrorCategory::Export,
            ControllerError::Verification { .. } => ErrorCategory::Network,
            ControllerError::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self, _locale: Locale) -> String {
        self.to_string()
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}
