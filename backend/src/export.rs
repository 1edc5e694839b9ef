//! Export and packaging pipeline
//!
//! Nodes are exported strictly one at a time, in selection order, with one
//! call per node for SVG and one call per (node, density) for raster
//! formats. The first failing call aborts the batch; no partial archive is
//! ever produced.

use tracing::{debug, info};

use crate::config::ExportConfig;
use crate::error::{ControllerResult, ExportError};
use crate::host::{DocumentHost, ExportSettings, SvgSettings};
use iconbridge_shared::utils::{raster_path, svg_path};
use iconbridge_shared::{ArchiveBuilder, ExportRequest, PackagedArchive, ValidationError};

/// Run one export request against the host's current selection
pub async fn export_selection<H>(
    host: &H,
    request: &ExportRequest,
    defaults: &ExportConfig,
) -> ControllerResult<PackagedArchive>
where
    H: DocumentHost + ?Sized,
{
    request.validate()?;

    let selection = host.selection().await;
    if selection.is_empty() {
        return Err(ValidationError::EmptySelection.into());
    }

    let densities = request.unique_densities();
    let quality = request.jpeg_quality(defaults.jpeg_quality);
    let mut builder = ArchiveBuilder::new()
        .with_name(Some(&defaults.archive_name))
        .with_name(request.zip_name.as_deref());

    info!(
        "Exporting {} nodes as {} (densities: {}, grouped: {})",
        selection.len(),
        request.format,
        densities.len(),
        request.group_by_size
    );

    for node in &selection {
        let base_size = node.base_size();

        if !request.format.is_raster() {
            let settings = ExportSettings::Svg(SvgSettings::default());
            let bytes = host
                .export(&node.id, &settings)
                .await
                .map_err(ExportError::from)?;
            builder.add(svg_path(&node.name, base_size, request.group_by_size), bytes);
            continue;
        }

        for density in &densities {
            let settings = ExportSettings::Raster {
                format: request.format,
                scale: density.scale(),
                quality,
            };
            let bytes = host
                .export(&node.id, &settings)
                .await
                .map_err(ExportError::from)?;
            builder.add(
                raster_path(
                    &node.name,
                    base_size,
                    request.group_by_size,
                    *density,
                    request.format,
                ),
                bytes,
            );
        }

        debug!("Exported node {} (base size {})", node.id, base_size);
    }

    let archive = builder.finish().map_err(ExportError::from)?;
    info!(
        "Created {} with {} entries ({} bytes)",
        archive.name,
        archive.entry_count,
        archive.bytes.len()
    );
    Ok(archive)
}
