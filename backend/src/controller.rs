//! The privileged controller
//!
//! The controller owns storage and document access. It bootstraps the panel
//! with an `init` snapshot, re-emits the selection count whenever the host
//! reports a change, and dispatches every inbound [`UiRequest`] through a
//! single exhaustive match.
//!
//! Handlers run concurrently on one task: a handler that awaits I/O lets
//! later requests begin dispatch, so responses may interleave. Correlation
//! ids let the panel discard stale completions; in-flight work is never
//! cancelled.

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ExportConfig};
use crate::error::{ControllerError, ControllerResult, UserFriendlyError};
use crate::export::export_selection;
use crate::host::DocumentHost;
use crate::storage::{KeyValueStore, SessionStorage};
use iconbridge_shared::bridge::{Inbox, Outbox};
use iconbridge_shared::protocol::{
    ArchivePayload, InitPayload, KindPayload, TokenPayload, TokenValidPayload,
};
use iconbridge_shared::{
    Credential, Locale, Message, PanelMessage, TokenVerifier, UiRequest, ValidationError,
};

pub struct Controller<S, H, V> {
    storage: SessionStorage<S>,
    host: Arc<H>,
    verifier: V,
    outbox: Outbox<PanelMessage>,
    export_config: ExportConfig,
    locale: Locale,
}

impl<S, H, V> Controller<S, H, V>
where
    S: KeyValueStore,
    H: DocumentHost,
    V: TokenVerifier,
{
    pub fn new(store: S, host: Arc<H>, verifier: V, outbox: Outbox<PanelMessage>) -> Self {
        Self {
            storage: SessionStorage::new(store),
            host,
            verifier,
            outbox,
            export_config: ExportConfig::default(),
            locale: Locale::default(),
        }
    }

    /// Apply the export defaults and locale from `config`
    pub fn configured(mut self, config: &Config) -> Self {
        self.export_config = config.export.clone();
        self.locale = config.ui.locale;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn storage(&self) -> &SessionStorage<S> {
        &self.storage
    }

    /// Emit `init` with the stored snapshot, then the current selection count
    pub async fn bootstrap(&self) {
        match self.init_payload().await {
            Ok(payload) => {
                info!("Bootstrapping panel with repository {}", payload.selected);
                self.outbox.post(PanelMessage::Init { payload });
            }
            Err(error) => {
                error!("Bootstrap failed: {}", error);
                self.outbox
                    .post(PanelMessage::error(error.user_message(self.locale)));
            }
        }

        let count = self.host.selection().await.len();
        self.outbox.post(PanelMessage::selection(count));
    }

    async fn init_payload(&self) -> ControllerResult<InitPayload> {
        let selected = self.storage.selected_kind().await?;
        let tokens = self.storage.all_tokens().await?;
        Ok(InitPayload { selected, tokens })
    }

    /// Bootstrap, then serve requests until the inbox closes and all
    /// in-flight handlers have finished.
    pub async fn run(&self, mut inbox: Inbox<UiRequest>) {
        let mut selection = self.host.watch_selection();
        selection.borrow_and_update();

        self.bootstrap().await;

        let mut in_flight = FuturesUnordered::new();
        let mut inbox_open = true;
        let mut selection_open = true;

        loop {
            tokio::select! {
                request = inbox.recv(), if inbox_open => match request {
                    Some(request) => in_flight.push(self.dispatch(request)),
                    None => {
                        debug!("Panel closed the bridge, draining {} handlers", in_flight.len());
                        inbox_open = false;
                    }
                },
                Some(()) = in_flight.next(), if !in_flight.is_empty() => {}
                changed = selection.changed(), if selection_open => match changed {
                    Ok(()) => {
                        let count = *selection.borrow_and_update();
                        debug!("Selection changed: {} nodes", count);
                        self.outbox.post(PanelMessage::selection(count));
                    }
                    Err(_) => selection_open = false,
                },
                else => break,
            }

            if !inbox_open && in_flight.is_empty() {
                break;
            }
        }

        info!("Controller stopped");
    }

    /// Handle one request. Failures of any kind, panics included, become an
    /// `error` message; the controller keeps serving afterwards.
    pub async fn dispatch(&self, request: UiRequest) {
        let name = request.type_name();
        let target = request.target();
        let req_id = request.req_id().cloned();
        debug!("Dispatching {} (reqId: {:?})", name, req_id);

        let outcome = AssertUnwindSafe(self.handle(request)).catch_unwind().await;
        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(error)) => error,
            Err(_) => ControllerError::Internal {
                message: format!("{} handler panicked", name),
            },
        };

        warn!("{} failed [{}]: {}", name, error.category(), error);
        self.outbox.post(PanelMessage::correlated_error(
            error.user_message(self.locale),
            target,
            req_id,
        ));
    }

    async fn handle(&self, request: UiRequest) -> ControllerResult<()> {
        match request {
            UiRequest::SetSelected { payload } => {
                self.storage.set_selected_kind(payload.kind).await?;
                self.outbox.post(PanelMessage::SelectedSaved { payload });
            }

            UiRequest::SaveToken { payload } => {
                let credential = Credential::for_kind(payload.kind, payload.token.as_str())?;
                self.storage.set_token(payload.kind, &credential).await?;
                info!("Saved token {} for {}", credential.redacted(), payload.kind);
                self.outbox.post(PanelMessage::TokenSaved {
                    payload: TokenPayload {
                        kind: payload.kind,
                        token: credential.reveal().to_string(),
                    },
                });
            }

            UiRequest::ClearToken { payload } => {
                self.storage.clear_token(payload.kind).await?;
                info!("Cleared token for {}", payload.kind);
                self.outbox.post(PanelMessage::TokenCleared {
                    payload: KindPayload { kind: payload.kind },
                });
            }

            UiRequest::CheckToken { payload, req_id } => {
                let kind = payload.kind;
                let credential = self.storage.token(kind).await?.ok_or_else(|| {
                    ValidationError::MissingCredential {
                        kind: kind.to_string(),
                    }
                })?;

                let result = self.verifier.verify(kind, credential.reveal()).await;
                match result.display_name() {
                    Some(login) if result.ok => {
                        info!("Token for {} belongs to {}", kind, login);
                        self.outbox.post(PanelMessage::TokenValid {
                            payload: TokenValidPayload {
                                kind,
                                login: login.to_string(),
                            },
                            req_id,
                        });
                    }
                    _ => {
                        let fallback = self.locale.render(&Message::VerificationFailed);
                        return Err(ControllerError::Verification {
                            message: result.describe_failure(&fallback),
                        });
                    }
                }
            }

            UiRequest::Export { payload, .. } => {
                let archive =
                    export_selection(self.host.as_ref(), &payload, &self.export_config).await?;
                self.outbox.post(PanelMessage::SaveArchive {
                    payload: ArchivePayload {
                        zip_name: archive.name,
                        zip_bytes: archive.bytes,
                    },
                });
            }

            UiRequest::Malformed { request, reason, .. } => {
                return Err(ValidationError::MalformedRequest { request, reason }.into());
            }

            UiRequest::Ignored => debug!("Ignoring unrecognized request"),
        }

        Ok(())
    }
}
