//! Document host backed by SVG files on disk
//!
//! The "selection" is a list of SVG files. Each file is one node named after
//! its file stem. Nominal geometry is the SVG canvas; the tight render
//! bounds are the stroke-inclusive bounding box of the drawn content.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::{debug, info};

use super::{DocumentHost, ExportSettings};
use crate::error::HostError;
use iconbridge_shared::{ExportFormat, NodeGeometry, NodeId, NodeSnapshot};

#[derive(Debug, Clone)]
struct SvgNode {
    id: NodeId,
    name: String,
    source: Arc<Vec<u8>>,
    geometry: NodeGeometry,
}

#[derive(Debug)]
pub struct SvgDirectoryHost {
    nodes: RwLock<Vec<SvgNode>>,
    selection_tx: watch::Sender<usize>,
}

impl SvgDirectoryHost {
    /// Host whose selection is exactly `paths`, in order
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self, HostError> {
        let nodes = load_nodes(paths)?;
        let (selection_tx, _) = watch::channel(nodes.len());
        info!("SVG host loaded {} nodes", nodes.len());
        Ok(Self {
            nodes: RwLock::new(nodes),
            selection_tx,
        })
    }

    /// Host whose selection is every `*.svg` file in `dir`, sorted by path
    pub fn from_directory<P: AsRef<Path>>(dir: P) -> Result<Self, HostError> {
        Self::from_paths(&list_svg_files(dir.as_ref())?)
    }

    /// Host from command line sources: one directory, or a list of files
    pub fn from_sources(sources: &[PathBuf]) -> Result<Self, HostError> {
        match sources {
            [dir] if dir.is_dir() => Self::from_directory(dir),
            files => Self::from_paths(files),
        }
    }

    /// Replace the selection and notify watchers
    pub fn set_selection<P: AsRef<Path>>(&self, paths: &[P]) -> Result<usize, HostError> {
        let nodes = load_nodes(paths)?;
        let count = nodes.len();
        *self.nodes.write().unwrap_or_else(|e| e.into_inner()) = nodes;
        self.selection_tx.send_replace(count);
        debug!("Selection changed to {} nodes", count);
        Ok(count)
    }

    fn find(&self, id: &NodeId) -> Option<SvgNode> {
        self.nodes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|node| &node.id == id)
            .cloned()
    }
}

/// Every `*.svg` file directly inside `dir`, sorted
pub fn list_svg_files(dir: &Path) -> Result<Vec<PathBuf>, HostError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_svg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
        if path.is_file() && is_svg {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn load_nodes<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<SvgNode>, HostError> {
    paths.iter().map(|p| load_node(p.as_ref())).collect()
}

fn load_node(path: &Path) -> Result<SvgNode, HostError> {
    let id = NodeId::new(path.to_string_lossy());
    let source = fs::read(path)?;
    let tree = parse_tree(&id, &source)?;

    let size = tree.size();
    let mut geometry = NodeGeometry::nominal(size.width() as f64, size.height() as f64);
    if tree.root().has_children() {
        let bounds = tree.root().abs_stroke_bounding_box();
        geometry = geometry.with_render_bounds(bounds.width() as f64, bounds.height() as f64);
    }

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(SvgNode {
        id,
        name,
        source: Arc::new(source),
        geometry,
    })
}

fn parse_tree(id: &NodeId, source: &[u8]) -> Result<usvg::Tree, HostError> {
    let options = usvg::Options::default();
    usvg::Tree::from_data(source, &options).map_err(|e| HostError::Render {
        node: id.clone(),
        reason: e.to_string(),
    })
}

fn render_pixmap(id: &NodeId, source: &[u8], scale: f32) -> Result<tiny_skia::Pixmap, HostError> {
    let tree = parse_tree(id, source)?;
    let size = tree.size();
    let width = (size.width() * scale).ceil().max(1.0) as u32;
    let height = (size.height() * scale).ceil().max(1.0) as u32;

    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| HostError::Render {
        node: id.clone(),
        reason: format!("cannot allocate a {}x{} canvas", width, height),
    })?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap)
}

fn encode_png(id: &NodeId, pixmap: &tiny_skia::Pixmap) -> Result<Vec<u8>, HostError> {
    pixmap.encode_png().map_err(|e| HostError::Render {
        node: id.clone(),
        reason: e.to_string(),
    })
}

/// JPEG has no alpha: composite the premultiplied pixels over white
fn encode_jpeg(id: &NodeId, pixmap: &tiny_skia::Pixmap, quality: f32) -> Result<Vec<u8>, HostError> {
    let mut rgb = Vec::with_capacity(pixmap.width() as usize * pixmap.height() as usize * 3);
    for pixel in pixmap.pixels() {
        let background = 255 - pixel.alpha();
        rgb.push(pixel.red().saturating_add(background));
        rgb.push(pixel.green().saturating_add(background));
        rgb.push(pixel.blue().saturating_add(background));
    }

    let quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .write_image(&rgb, pixmap.width(), pixmap.height(), ExtendedColorType::Rgb8)
        .map_err(|e| HostError::Render {
            node: id.clone(),
            reason: e.to_string(),
        })?;
    Ok(bytes)
}

fn export_node(node: &SvgNode, settings: ExportSettings) -> Result<Vec<u8>, HostError> {
    match settings {
        ExportSettings::Svg(_) => Ok(node.source.as_ref().clone()),
        ExportSettings::Raster {
            format: ExportFormat::Png,
            scale,
            ..
        } => encode_png(&node.id, &render_pixmap(&node.id, &node.source, scale)?),
        ExportSettings::Raster {
            format: ExportFormat::Jpg,
            scale,
            quality,
        } => encode_jpeg(
            &node.id,
            &render_pixmap(&node.id, &node.source, scale)?,
            quality.unwrap_or(iconbridge_shared::models::DEFAULT_JPEG_QUALITY),
        ),
        ExportSettings::Raster {
            format: ExportFormat::Svg,
            ..
        } => Err(HostError::NotExportable {
            node: node.id.clone(),
        }),
    }
}

#[async_trait]
impl DocumentHost for SvgDirectoryHost {
    async fn selection(&self) -> Vec<NodeSnapshot> {
        self.nodes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|node| NodeSnapshot {
                id: node.id.clone(),
                name: node.name.clone(),
                geometry: node.geometry,
            })
            .collect()
    }

    async fn export(&self, node: &NodeId, settings: &ExportSettings) -> Result<Vec<u8>, HostError> {
        let svg_node = self
            .find(node)
            .ok_or_else(|| HostError::NodeNotFound { node: node.clone() })?;
        let settings = *settings;

        tokio::task::spawn_blocking(move || export_node(&svg_node, settings))
            .await
            .map_err(|e| HostError::Render {
                node: node.clone(),
                reason: e.to_string(),
            })?
    }

    fn watch_selection(&self) -> watch::Receiver<usize> {
        self.selection_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SvgSettings;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    const ICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24"><rect x="2" y="2" width="20" height="10" fill="#f00"/></svg>"##;

    fn write_icon(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, ICON).unwrap();
        path
    }

    #[tokio::test]
    async fn test_directory_selection_is_sorted() {
        let dir = tempdir().unwrap();
        write_icon(dir.path(), "b icon.svg");
        write_icon(dir.path(), "a icon.svg");
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let host = SvgDirectoryHost::from_directory(dir.path()).unwrap();
        let selection = host.selection().await;
        let names: Vec<_> = selection.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["a icon", "b icon"]);
    }

    #[tokio::test]
    async fn test_geometry_prefers_drawn_bounds() {
        let dir = tempdir().unwrap();
        let path = write_icon(dir.path(), "rect.svg");
        let host = SvgDirectoryHost::from_paths(&[path]).unwrap();

        let node = &host.selection().await[0];
        assert_eq!(node.geometry.nominal.width, 24.0);
        assert_eq!(node.base_size(), 20);
    }

    #[tokio::test]
    async fn test_raster_exports() {
        let dir = tempdir().unwrap();
        let path = write_icon(dir.path(), "rect.svg");
        let host = SvgDirectoryHost::from_paths(&[path]).unwrap();
        let id = host.selection().await[0].id.clone();

        let png = host
            .export(
                &id,
                &ExportSettings::Raster {
                    format: ExportFormat::Png,
                    scale: 2.0,
                    quality: None,
                },
            )
            .await
            .unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (48, 48));

        let jpg = host
            .export(
                &id,
                &ExportSettings::Raster {
                    format: ExportFormat::Jpg,
                    scale: 1.5,
                    quality: Some(0.8),
                },
            )
            .await
            .unwrap();
        assert_eq!(&jpg[..2], &[0xFF, 0xD8]);

        let svg = host
            .export(&id, &ExportSettings::Svg(SvgSettings::default()))
            .await
            .unwrap();
        assert_eq!(svg, ICON.as_bytes());
    }

    #[tokio::test]
    async fn test_selection_changes_are_pushed() {
        let dir = tempdir().unwrap();
        let first = write_icon(dir.path(), "one.svg");
        let second = write_icon(dir.path(), "two.svg");

        let host = SvgDirectoryHost::from_paths(&[first.clone()]).unwrap();
        let mut watcher = host.watch_selection();
        assert_eq!(*watcher.borrow(), 1);

        host.set_selection(&[first, second]).unwrap();
        watcher.changed().await.unwrap();
        assert_eq!(*watcher.borrow_and_update(), 2);
    }

    #[tokio::test]
    async fn test_unknown_node_and_invalid_svg() {
        let dir = tempdir().unwrap();
        let path = write_icon(dir.path(), "ok.svg");
        let host = SvgDirectoryHost::from_paths(&[path]).unwrap();

        let result = host
            .export(
                &NodeId::new("missing"),
                &ExportSettings::Svg(SvgSettings::default()),
            )
            .await;
        assert_matches!(result, Err(HostError::NodeNotFound { .. }));

        let broken = dir.path().join("broken.svg");
        fs::write(&broken, "<not-svg").unwrap();
        assert_matches!(
            SvgDirectoryHost::from_paths(&[broken]),
            Err(HostError::Render { .. })
        );
    }
}
