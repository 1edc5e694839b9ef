//! iconbridge UI panel
//!
//! The panel never touches the document or storage. It renders state derived
//! purely from controller messages, turns user intent into [`UiRequest`]s and
//! saves archives that arrive from the controller.
//!
//! [`UiRequest`]: iconbridge_shared::UiRequest

pub mod download;
pub mod session;
pub mod state;

pub use download::{ArchiveDownload, DirectorySink, DownloadError, DownloadSink};
pub use session::{PanelSession, SessionError};
pub use state::PanelState;
