//! Panel side of the bridge
//!
//! A [`PanelSession`] owns the outbound request channel and the subscription
//! registry over inbound controller messages. It keeps a [`PanelState`]
//! current through its own subscription and hands arriving archives to a
//! [`DownloadSink`]. Callers can wait for the response that answers a given
//! request.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::download::DownloadSink;
use crate::state::{NotificationLevel, PanelState};
use iconbridge_shared::bridge::{Inbox, Outbox, Subscription, SubscriptionRegistry};
use iconbridge_shared::{Locale, PanelMessage, RequestTarget, UiRequest};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No response to {request} within {after:?}")]
    Timeout {
        request: &'static str,
        after: Duration,
    },

    #[error("The controller closed the bridge")]
    Closed,
}

/// Whether `message` is the completion of `request`.
///
/// Correlated requests match on their request id. Uncorrelated ones match
/// their acknowledgement or an untargeted error.
pub fn is_response_to(request: &UiRequest, message: &PanelMessage) -> bool {
    let untargeted_error = matches!(message, PanelMessage::Error { target: None, .. });

    match request {
        UiRequest::SetSelected { .. } => {
            matches!(message, PanelMessage::SelectedSaved { .. }) || untargeted_error
        }
        UiRequest::SaveToken { .. } => {
            matches!(message, PanelMessage::TokenSaved { .. }) || untargeted_error
        }
        UiRequest::ClearToken { .. } => {
            matches!(message, PanelMessage::TokenCleared { .. }) || untargeted_error
        }
        UiRequest::CheckToken { req_id, .. } => match message {
            PanelMessage::TokenValid { req_id: answer, .. } => answer == req_id,
            PanelMessage::Error {
                target: Some(RequestTarget::CheckToken),
                req_id: answer,
                ..
            } => answer == req_id,
            _ => false,
        },
        UiRequest::Export { req_id, .. } => match message {
            PanelMessage::SaveArchive { .. } => true,
            PanelMessage::Error {
                target: Some(RequestTarget::Export),
                req_id: answer,
                ..
            } => answer == req_id,
            _ => false,
        },
        UiRequest::Malformed { .. } | UiRequest::Ignored => false,
    }
}

pub struct PanelSession {
    outbox: Outbox<UiRequest>,
    registry: SubscriptionRegistry<PanelMessage>,
    state: Arc<Mutex<PanelState>>,
    downloads: Arc<Mutex<Vec<PathBuf>>>,
    _state_subscription: Subscription<PanelMessage>,
}

impl PanelSession {
    /// Attach to the bridge. Must be called inside a tokio runtime.
    pub fn new(
        outbox: Outbox<UiRequest>,
        inbox: Inbox<PanelMessage>,
        sink: Arc<dyn DownloadSink>,
        locale: Locale,
    ) -> Self {
        let registry = SubscriptionRegistry::new(inbox);
        let state = Arc::new(Mutex::new(PanelState::new(locale)));
        let downloads = Arc::new(Mutex::new(Vec::new()));

        let state_subscription = {
            let state = Arc::clone(&state);
            let downloads = Arc::clone(&downloads);
            registry.subscribe(move |message: &PanelMessage| {
                let mut state = lock(&state);
                let Some(download) = state.apply(message) else {
                    return;
                };
                match sink.deliver(&download) {
                    Ok(path) => lock(&downloads).push(path),
                    Err(e) => {
                        error!("Failed to save {}: {}", download.name, e);
                        state
                            .notifications
                            .push(NotificationLevel::Failure, e.to_string());
                    }
                }
            })
        };

        Self {
            outbox,
            registry,
            state,
            downloads,
            _state_subscription: state_subscription,
        }
    }

    pub fn send(&self, request: UiRequest) {
        debug!("Posting {}", request.type_name());
        self.outbox.post(request);
    }

    /// Extra listener for every inbound message
    pub fn subscribe<F>(&self, listener: F) -> Subscription<PanelMessage>
    where
        F: Fn(&PanelMessage) + Send + Sync + 'static,
    {
        self.registry.subscribe(listener)
    }

    /// Copy of the current view state
    pub fn state(&self) -> PanelState {
        lock(&self.state).clone()
    }

    /// Run `f` against the live view state
    pub fn with_state<R>(&self, f: impl FnOnce(&mut PanelState) -> R) -> R {
        f(&mut lock(&self.state))
    }

    /// Paths of archives saved since the last call
    pub fn take_downloads(&self) -> Vec<PathBuf> {
        std::mem::take(&mut *lock(&self.downloads))
    }

    /// Send `request` and wait for the message that answers it.
    ///
    /// `limit` of `None` waits indefinitely, which suits exports: they have
    /// no deadline of their own.
    pub async fn request_and_wait(
        &self,
        request: UiRequest,
        limit: Option<Duration>,
    ) -> Result<PanelMessage, SessionError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let expected = request.clone();
        let _subscription = self.subscribe(move |message: &PanelMessage| {
            if is_response_to(&expected, message) {
                let _ = tx.send(message.clone());
            }
        });

        let name = request.type_name();
        self.send(request);

        let response = match limit {
            Some(after) => tokio::time::timeout(after, rx.recv())
                .await
                .map_err(|_| SessionError::Timeout {
                    request: name,
                    after,
                })?,
            None => rx.recv().await,
        };
        response.ok_or(SessionError::Closed)
    }

    /// Wait until `ready` holds for the view state
    pub async fn wait_until<F>(&self, ready: F, limit: Duration) -> Result<(), SessionError>
    where
        F: Fn(&PanelState) -> bool,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // Registered before the first check so no update slips between them
        let _subscription = self.subscribe(move |_: &PanelMessage| {
            let _ = tx.send(());
        });

        let wait = async {
            loop {
                let done = ready(&lock(&self.state));
                if done {
                    return Ok(());
                }
                if rx.recv().await.is_none() {
                    return Err(SessionError::Closed);
                }
            }
        };

        tokio::time::timeout(limit, wait).await.map_err(|_| {
            warn!("Panel state not ready after {:?}", limit);
            SessionError::Timeout {
                request: "init",
                after: limit,
            }
        })?
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use iconbridge_shared::protocol::{KindPayload, TokenValidPayload};
    use iconbridge_shared::{RepositoryKind, RequestId};

    fn token_valid(req_id: &str) -> PanelMessage {
        PanelMessage::TokenValid {
            payload: TokenValidPayload {
                kind: RepositoryKind::PublicIcons,
                login: "octocat".to_string(),
            },
            req_id: Some(RequestId::from(req_id)),
        }
    }

    #[test]
    fn test_correlated_responses_match_by_id() {
        let check = UiRequest::check_token(RepositoryKind::PublicIcons, RequestId::from("a"));
        assert!(is_response_to(&check, &token_valid("a")));
        assert!(!is_response_to(&check, &token_valid("b")));
        assert!(!is_response_to(
            &check,
            &PanelMessage::correlated_error(
                "x",
                Some(RequestTarget::Export),
                Some(RequestId::from("a"))
            )
        ));
        assert!(!is_response_to(&check, &PanelMessage::error("x")));
    }

    #[test]
    fn test_uncorrelated_responses_match_by_type() {
        let select = UiRequest::set_selected(RepositoryKind::PrivateIcons);
        let saved = PanelMessage::SelectedSaved {
            payload: KindPayload {
                kind: RepositoryKind::PrivateIcons,
            },
        };
        assert!(is_response_to(&select, &saved));
        assert!(is_response_to(&select, &PanelMessage::error("x")));
        assert!(!is_response_to(&select, &PanelMessage::selection(1)));
        assert!(!is_response_to(&UiRequest::Ignored, &saved));
    }
}
