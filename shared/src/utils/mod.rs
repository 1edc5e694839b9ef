//! Utility modules for iconbridge
//!
//! Currently this is the asset naming and archive path derivation used by
//! the export pipeline.

pub mod naming;

pub use naming::{group_folder, raster_path, sanitize_name, svg_path};

/// Folder used when grouping is disabled or the base size is unknown
pub const UNSORTED_FOLDER: &str = "Unsorted";

/// Name substituted when sanitization leaves nothing behind
pub const FALLBACK_NAME: &str = "asset";
