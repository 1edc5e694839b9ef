//! Export form view state

use iconbridge_shared::{
    Density, ExportFormat, ExportRequest, PanelMessage, RepositoryKind, RequestId,
    RequestTarget, ServiceKind, UiRequest,
};

use crate::download::ArchiveDownload;

/// Export options and progress.
///
/// Repositories on GitHub only take vector assets: while one is active the
/// format is pinned to SVG and the format selector is locked.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportState {
    format: ExportFormat,
    densities: Vec<Density>,
    group_by_size: bool,
    quality: Option<f32>,
    zip_name: Option<String>,
    format_locked: bool,
    processing: bool,
    last_request: Option<RequestId>,
}

impl Default for ExportState {
    fn default() -> Self {
        let mut state = Self {
            format: ExportFormat::Svg,
            densities: Density::ALL.to_vec(),
            group_by_size: true,
            quality: None,
            zip_name: None,
            format_locked: false,
            processing: false,
            last_request: None,
        };
        state.on_repository(RepositoryKind::default());
        state
    }
}

impl ExportState {
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn densities(&self) -> &[Density] {
        &self.densities
    }

    pub fn group_by_size(&self) -> bool {
        self.group_by_size
    }

    pub fn is_format_locked(&self) -> bool {
        self.format_locked
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn last_request(&self) -> Option<&RequestId> {
        self.last_request.as_ref()
    }

    /// Change the format; refused while the selector is locked
    pub fn set_format(&mut self, format: ExportFormat) -> bool {
        if self.format_locked && format != ExportFormat::Svg {
            return false;
        }
        self.format = format;
        true
    }

    pub fn set_densities(&mut self, densities: Vec<Density>) {
        self.densities = densities;
    }

    pub fn toggle_density(&mut self, density: Density) {
        if let Some(index) = self.densities.iter().position(|d| *d == density) {
            self.densities.remove(index);
        } else {
            self.densities.push(density);
        }
    }

    pub fn set_group_by_size(&mut self, group_by_size: bool) {
        self.group_by_size = group_by_size;
    }

    pub fn toggle_group_by_size(&mut self) {
        self.group_by_size = !self.group_by_size;
    }

    pub fn set_quality(&mut self, quality: Option<f32>) {
        self.quality = quality;
    }

    pub fn set_zip_name(&mut self, zip_name: Option<String>) {
        self.zip_name = zip_name;
    }

    /// Follow a change of the active repository
    pub fn on_repository(&mut self, kind: RepositoryKind) {
        self.format_locked = kind.service() == ServiceKind::GitHub;
        if self.format_locked {
            self.format = ExportFormat::Svg;
        }
    }

    /// Request for the current options
    pub fn request(&self) -> ExportRequest {
        ExportRequest {
            format: self.format,
            densities: self.densities.clone(),
            group_by_size: self.group_by_size,
            quality: self.quality,
            zip_name: self.zip_name.clone(),
        }
    }

    /// Mark an export as running and build its correlated request
    pub fn start(&mut self) -> UiRequest {
        let req_id = RequestId::generate();
        self.processing = true;
        self.last_request = Some(req_id.clone());
        UiRequest::export(self.request(), req_id)
    }

    /// Apply a controller message, returning an archive to save if one arrived
    pub fn apply(&mut self, message: &PanelMessage) -> Option<ArchiveDownload> {
        match message {
            PanelMessage::SaveArchive { payload } => {
                self.reset();
                Some(ArchiveDownload {
                    name: payload.zip_name.clone(),
                    bytes: payload.zip_bytes.clone(),
                })
            }
            PanelMessage::Error {
                target: Some(RequestTarget::Export),
                req_id,
                ..
            } => {
                let current = match &self.last_request {
                    None => true,
                    Some(last) => req_id.as_ref() == Some(last),
                };
                if current {
                    self.reset();
                }
                None
            }
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.processing = false;
        self.last_request = None;
    }
}
