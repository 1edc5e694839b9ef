//! Token management view state

use std::collections::BTreeMap;

use iconbridge_shared::{PanelMessage, RepositoryKind, RequestId, RequestTarget, UiRequest};

/// Edited and persisted tokens per repository kind, plus verification
/// progress.
///
/// The edited map is reset to the saved map whenever the saved map changes,
/// so a successful save or clear discards unsaved edits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    edited: BTreeMap<RepositoryKind, String>,
    saved: BTreeMap<RepositoryKind, String>,
    verifying: bool,
    last_check: Option<RequestId>,
}

impl AuthState {
    /// Token currently in the input for `kind`
    pub fn token(&self, kind: RepositoryKind) -> &str {
        self.edited.get(&kind).map(String::as_str).unwrap_or_default()
    }

    /// Token persisted by the controller for `kind`
    pub fn saved_token(&self, kind: RepositoryKind) -> &str {
        self.saved.get(&kind).map(String::as_str).unwrap_or_default()
    }

    pub fn edit(&mut self, kind: RepositoryKind, token: impl Into<String>) {
        self.edited.insert(kind, token.into());
    }

    /// A token is saved when one is persisted and the input still matches it
    pub fn is_token_saved(&self, kind: RepositoryKind) -> bool {
        let saved = self.saved_token(kind);
        !saved.is_empty() && saved == self.token(kind)
    }

    pub fn is_verifying(&self) -> bool {
        self.verifying
    }

    pub fn last_check(&self) -> Option<&RequestId> {
        self.last_check.as_ref()
    }

    pub fn save_request(&self, kind: RepositoryKind) -> UiRequest {
        UiRequest::save_token(kind, self.token(kind))
    }

    pub fn clear_request(&self, kind: RepositoryKind) -> UiRequest {
        UiRequest::clear_token(kind)
    }

    /// Start a verification, superseding any check still in flight
    pub fn begin_check(&mut self, kind: RepositoryKind) -> UiRequest {
        let req_id = RequestId::generate();
        self.last_check = Some(req_id.clone());
        self.verifying = true;
        UiRequest::check_token(kind, req_id)
    }

    pub fn apply(&mut self, message: &PanelMessage) {
        match message {
            PanelMessage::Init { payload } => {
                self.set_saved(payload.tokens.clone());
            }
            PanelMessage::TokenSaved { payload } => {
                let mut saved = self.saved.clone();
                saved.insert(payload.kind, payload.token.clone());
                self.set_saved(saved);
            }
            PanelMessage::TokenCleared { payload } => {
                let mut saved = self.saved.clone();
                saved.insert(payload.kind, String::new());
                self.set_saved(saved);
            }
            PanelMessage::TokenValid { req_id, .. } => {
                if self.is_current(req_id.as_ref()) {
                    self.finish_check();
                }
            }
            PanelMessage::Error {
                target: Some(RequestTarget::CheckToken),
                req_id,
                ..
            } => {
                if self.is_current(req_id.as_ref()) {
                    self.finish_check();
                }
            }
            _ => {}
        }
    }

    fn set_saved(&mut self, saved: BTreeMap<RepositoryKind, String>) {
        self.edited = saved.clone();
        self.saved = saved;
    }

    fn is_current(&self, req_id: Option<&RequestId>) -> bool {
        match &self.last_check {
            None => true,
            Some(last) => req_id == Some(last),
        }
    }

    fn finish_check(&mut self) {
        self.verifying = false;
        self.last_check = None;
    }
}
