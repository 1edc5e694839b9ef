//! Saving archives delivered by the controller
//!
//! Archive names come from the other side of the bridge, so only the final
//! path component is honoured: a name can never escape the target directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

/// An archive waiting to be saved
#[derive(Clone, PartialEq, Eq)]
pub struct ArchiveDownload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ArchiveDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveDownload")
            .field("name", &self.name)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Archive name is not a valid file name: {name:?}")]
    InvalidName { name: String },

    #[error("Failed to save archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for downloaded archives
pub trait DownloadSink: Send + Sync {
    /// Save `download`, returning where it ended up
    fn deliver(&self, download: &ArchiveDownload) -> Result<PathBuf, DownloadError>;
}

/// Writes archives into one directory under their archive name
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn target_for(&self, name: &str) -> Result<PathBuf, DownloadError> {
        let file_name = Path::new(name)
            .file_name()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DownloadError::InvalidName {
                name: name.to_string(),
            })?;
        Ok(self.dir.join(file_name))
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, download: &ArchiveDownload) -> Result<PathBuf, DownloadError> {
        let target = self.target_for(&download.name)?;
        fs::create_dir_all(&self.dir)?;

        // Write next to the target, then rename over it
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(&download.bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&target).map_err(|e| DownloadError::Io(e.error))?;

        debug!("Wrote {} bytes", download.bytes.len());
        info!("Saved archive to {:?}", target);
        Ok(target)
    }
}
