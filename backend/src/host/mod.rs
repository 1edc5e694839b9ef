//! Document host abstraction
//!
//! The controller never touches a document directly. A [`DocumentHost`]
//! exposes the current selection as geometry snapshots, produces bytes for
//! one node at a time, and pushes a notification whenever the selection
//! changes.

#[cfg(any(test, feature = "test-support"))]
pub mod scripted;
pub mod svg_dir;

#[cfg(any(test, feature = "test-support"))]
pub use scripted::ScriptedHost;
pub use svg_dir::SvgDirectoryHost;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::HostError;
use iconbridge_shared::{ExportFormat, NodeId, NodeSnapshot};

/// Vector export settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvgSettings {
    pub use_absolute_bounds: bool,
    pub outline_text: bool,
    pub embed_id: bool,
    pub simplify_stroke: bool,
}

impl Default for SvgSettings {
    fn default() -> Self {
        Self {
            use_absolute_bounds: true,
            outline_text: true,
            embed_id: true,
            simplify_stroke: false,
        }
    }
}

/// What a single host export call should produce
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExportSettings {
    Svg(SvgSettings),
    Raster {
        format: ExportFormat,
        /// Uniform scale constraint
        scale: f32,
        /// JPEG quality in `[0, 1]`, only for `jpg`
        quality: Option<f32>,
    },
}

impl ExportSettings {
    pub fn format(&self) -> ExportFormat {
        match self {
            ExportSettings::Svg(_) => ExportFormat::Svg,
            ExportSettings::Raster { format, .. } => *format,
        }
    }
}

#[async_trait]
pub trait DocumentHost: Send + Sync {
    /// Current selection, in selection order
    async fn selection(&self) -> Vec<NodeSnapshot>;

    /// Export one node. Calls are made one at a time.
    async fn export(&self, node: &NodeId, settings: &ExportSettings) -> Result<Vec<u8>, HostError>;

    /// Receiver notified with the new selection count on every change
    fn watch_selection(&self) -> watch::Receiver<usize>;
}
