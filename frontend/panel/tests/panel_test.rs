//! Panel session driving a real controller over the bridge

use assert_matches::assert_matches;
use async_trait::async_trait;
use std::fs::File;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

use iconbridge_backend::{Controller, MemoryStore, ScriptedHost};
use iconbridge_panel::state::NotificationLevel;
use iconbridge_panel::{DirectorySink, PanelSession};
use iconbridge_shared::bridge::channel;
use iconbridge_shared::{
    Density, ExportFormat, Locale, NodeGeometry, NodeSnapshot, PanelMessage, RepositoryKind,
    TokenVerifier, UiRequest, VerificationResult,
};

const LIMIT: Duration = Duration::from_secs(5);

/// Verifier whose n-th call sleeps for the n-th delay
struct SequencedVerifier {
    delays: Vec<Duration>,
    calls: AtomicUsize,
}

#[async_trait]
impl TokenVerifier for SequencedVerifier {
    async fn verify(&self, _kind: RepositoryKind, _token: &str) -> VerificationResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.get(call).copied().unwrap_or_default();
        tokio::time::sleep(delay).await;
        VerificationResult::success(200, format!("user{}", call))
    }
}

async fn start(
    nodes: Vec<NodeSnapshot>,
    delays: Vec<Duration>,
    out: &std::path::Path,
) -> PanelSession {
    let (message_outbox, message_inbox) = channel();
    let (request_outbox, request_inbox) = channel();
    let controller = Controller::new(
        MemoryStore::new(),
        Arc::new(ScriptedHost::new(nodes)),
        SequencedVerifier {
            delays,
            calls: AtomicUsize::new(0),
        },
        message_outbox,
    );
    tokio::spawn(async move { controller.run(request_inbox).await });

    let session = PanelSession::new(
        request_outbox,
        message_inbox,
        Arc::new(DirectorySink::new(out)),
        Locale::En,
    );
    session
        .wait_until(
            |state| state.is_initialized() && state.selection.count().is_some(),
            LIMIT,
        )
        .await
        .unwrap();
    session
}

#[tokio::test]
async fn test_export_downloads_archive() {
    let dir = tempdir().unwrap();
    let nodes = vec![
        NodeSnapshot::new("1", "Icon One", NodeGeometry::nominal(24.0, 20.0)),
        NodeSnapshot::new("2", "", NodeGeometry::nominal(40.0, 40.0).with_render_bounds(48.0, 30.0)),
    ];
    let session = start(nodes, Vec::new(), dir.path()).await;
    assert_eq!(session.state().selection.count(), Some(2));

    session
        .request_and_wait(
            UiRequest::set_selected(RepositoryKind::PrivateIcons),
            Some(LIMIT),
        )
        .await
        .unwrap();

    let request = session.with_state(|state| {
        assert!(state.export.set_format(ExportFormat::Png));
        state.export.set_densities(vec![Density::Mdpi, Density::Xhdpi]);
        state.export.start()
    });
    assert!(session.state().export.is_processing());

    let response = session.request_and_wait(request, Some(LIMIT)).await.unwrap();
    assert_matches!(response, PanelMessage::SaveArchive { .. });

    let state = session.state();
    assert!(!state.export.is_processing());
    assert_eq!(
        state.notifications.latest().map(|n| n.text.as_str()),
        Some("Zip archive created")
    );

    let downloads = session.take_downloads();
    assert_eq!(downloads, vec![dir.path().join("images_export.zip")]);

    let mut archive = zip::ZipArchive::new(File::open(&downloads[0]).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "24/drawable-mdpi/icon_one.png",
            "24/drawable-xhdpi/icon_one.png",
            "48/drawable-mdpi/asset.png",
            "48/drawable-xhdpi/asset.png",
        ]
    );
    assert!(archive.by_name("48/drawable-xhdpi/asset.png").is_ok());
}

#[tokio::test]
async fn test_rejected_token_leaves_slot_empty() {
    let dir = tempdir().unwrap();
    let session = start(Vec::new(), Vec::new(), dir.path()).await;

    let request = session.with_state(|state| {
        state.auth.edit(RepositoryKind::PublicIcons, "bad-token");
        state.auth.save_request(RepositoryKind::PublicIcons)
    });
    let response = session.request_and_wait(request, Some(LIMIT)).await.unwrap();
    assert_matches!(response, PanelMessage::Error { target: None, .. });

    let state = session.state();
    assert_eq!(state.auth.saved_token(RepositoryKind::PublicIcons), "");
    assert!(!state.auth.is_token_saved(RepositoryKind::PublicIcons));
    assert_matches!(state.notifications.latest(), Some(notice) => {
        assert_eq!(notice.level, NotificationLevel::Failure);
        assert!(notice.text.starts_with("Error: "));
    });
}

#[tokio::test]
async fn test_stale_check_does_not_clear_newer_one() {
    let dir = tempdir().unwrap();
    let delays = vec![Duration::from_millis(10), Duration::from_millis(500)];
    let session = start(Vec::new(), delays, dir.path()).await;

    session
        .request_and_wait(
            UiRequest::save_token(RepositoryKind::PrivateIcons, "glpat-1"),
            Some(LIMIT),
        )
        .await
        .unwrap();

    let first = session.with_state(|state| state.auth.begin_check(RepositoryKind::PrivateIcons));
    session.send(first);
    let second = session.with_state(|state| state.auth.begin_check(RepositoryKind::PrivateIcons));
    session.send(second);

    // The first check answers first but is no longer the latest one
    session
        .wait_until(
            |state| {
                state
                    .notifications
                    .iter()
                    .any(|n| n.text == "Token is valid (user0)")
            },
            LIMIT,
        )
        .await
        .unwrap();
    assert!(session.state().auth.is_verifying());

    session
        .wait_until(|state| !state.auth.is_verifying(), LIMIT)
        .await
        .unwrap();
}
