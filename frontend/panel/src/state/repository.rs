//! Active repository and selection count

use iconbridge_shared::{PanelMessage, RepositoryKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveRepository {
    kind: RepositoryKind,
}

impl ActiveRepository {
    pub fn kind(&self) -> RepositoryKind {
        self.kind
    }

    /// Returns whether the active kind changed
    pub fn apply(&mut self, message: &PanelMessage) -> bool {
        let next = match message {
            PanelMessage::Init { payload } => payload.selected,
            PanelMessage::SelectedSaved { payload } => payload.kind,
            _ => return false,
        };
        let changed = next != self.kind;
        self.kind = next;
        changed
    }
}

/// Latest selection count pushed by the controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionInfo {
    count: Option<usize>,
}

impl SelectionInfo {
    /// `None` until the controller has reported a selection
    pub fn count(&self) -> Option<usize> {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count.unwrap_or(0) == 0
    }

    pub fn apply(&mut self, message: &PanelMessage) {
        if let PanelMessage::Selection { payload } = message {
            self.count = Some(payload.count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iconbridge_shared::protocol::KindPayload;

    #[test]
    fn test_active_repository_follows_controller() {
        let mut active = ActiveRepository::default();
        assert!(!active.apply(&PanelMessage::selection(3)));

        let changed = active.apply(&PanelMessage::SelectedSaved {
            payload: KindPayload {
                kind: RepositoryKind::InternalImages,
            },
        });
        assert!(changed);
        assert_eq!(active.kind(), RepositoryKind::InternalImages);
    }

    #[test]
    fn test_selection_mirrors_latest_count() {
        let mut selection = SelectionInfo::default();
        assert_eq!(selection.count(), None);
        assert!(selection.is_empty());

        selection.apply(&PanelMessage::selection(4));
        selection.apply(&PanelMessage::selection(2));
        assert_eq!(selection.count(), Some(2));
        assert!(!selection.is_empty());
    }
}
