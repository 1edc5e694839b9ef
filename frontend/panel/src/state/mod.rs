//! Panel view state
//!
//! Each piece of state is a reducer over controller messages. [`PanelState`]
//! feeds every inbound message to all of them; the only side effect that
//! falls out is an archive to save.

pub mod auth;
pub mod export;
pub mod notifications;
pub mod repository;

pub use auth::AuthState;
pub use export::ExportState;
pub use notifications::{Notification, NotificationLevel, Notifications};
pub use repository::{ActiveRepository, SelectionInfo};

use iconbridge_shared::{Locale, PanelMessage, RepositoryKind};

use crate::download::ArchiveDownload;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelState {
    pub active: ActiveRepository,
    pub selection: SelectionInfo,
    pub auth: AuthState,
    pub export: ExportState,
    pub notifications: Notifications,
    initialized: bool,
}

impl PanelState {
    pub fn new(locale: Locale) -> Self {
        Self {
            notifications: Notifications::new(locale),
            ..Default::default()
        }
    }

    /// Whether the controller's `init` snapshot has arrived
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn active_kind(&self) -> RepositoryKind {
        self.active.kind()
    }

    pub fn apply(&mut self, message: &PanelMessage) -> Option<ArchiveDownload> {
        if matches!(message, PanelMessage::Init { .. }) {
            self.initialized = true;
        }

        if self.active.apply(message) {
            self.export.on_repository(self.active.kind());
        }
        self.selection.apply(message);
        self.auth.apply(message);
        self.notifications.apply(message);
        self.export.apply(message)
    }
}
