//! Archive packaging for exported assets
//!
//! Export batches are accumulated as a path → bytes map and written into a
//! single deflate-compressed zip container.

pub mod packager;

pub use packager::{ArchiveBuilder, PackagedArchive};

use std::collections::BTreeMap;
use thiserror::Error;

/// Name given to an archive when the request does not override it
pub const DEFAULT_ARCHIVE_NAME: &str = "images_export.zip";

/// Archive entries keyed by their path inside the container
pub type FileMap = BTreeMap<String, Vec<u8>>;

/// Errors that can occur while packaging an archive
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to write archive entry {path}: {reason}")]
    EntryFailed { path: String, reason: String },

    #[error("Failed to finalize archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;
