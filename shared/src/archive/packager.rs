//! Zip packager

use std::io::{Cursor, Write};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{ArchiveError, ArchiveResult, FileMap, DEFAULT_ARCHIVE_NAME};

/// Accumulates archive entries for one export batch
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    name: String,
    entries: FileMap,
}

/// A finished archive, ready to hand to the panel
#[derive(Clone, PartialEq, Eq)]
pub struct PackagedArchive {
    pub name: String,
    pub bytes: Vec<u8>,
    pub entry_count: usize,
}

impl std::fmt::Debug for PackagedArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackagedArchive")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .field("entry_count", &self.entry_count)
            .finish()
    }
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            name: DEFAULT_ARCHIVE_NAME.to_string(),
            entries: FileMap::new(),
        }
    }

    /// Override the archive name; blank names keep the default
    pub fn with_name(mut self, name: Option<&str>) -> Self {
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            self.name = name.to_string();
        }
        self
    }

    /// Add an entry. A second entry at the same path replaces the first;
    /// returns `true` when that happened.
    pub fn add(&mut self, path: impl Into<String>, bytes: Vec<u8>) -> bool {
        let path = path.into();
        let replaced = self.entries.insert(path.clone(), bytes).is_some();
        if replaced {
            warn!("Archive entry {} was overwritten by a later export", path);
        }
        replaced
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Compress every entry into one zip blob
    pub fn finish(self) -> ArchiveResult<PackagedArchive> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for (path, bytes) in &self.entries {
            writer
                .start_file(path.as_str(), options)
                .map_err(|e| ArchiveError::EntryFailed {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            writer.write_all(bytes)?;
        }

        let bytes = writer.finish()?.into_inner();
        debug!(
            "Packaged {} entries into {} ({} bytes)",
            self.entries.len(),
            self.name,
            bytes.len()
        );

        Ok(PackagedArchive {
            name: self.name,
            entry_count: self.entries.len(),
            bytes,
        })
    }
}
