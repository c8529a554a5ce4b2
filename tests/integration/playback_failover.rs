use crate::common::mocks::RecordingSurface;
use crate::common::{mock_stream, mock_stream_missing, mock_stream_ok, next_event, wait_for_state};
use mirrorplay::config::Config;
use mirrorplay::models::{BackendKind, ProviderName, QualityEntry, QualitySelection};
use mirrorplay::player::{PlaybackState, SessionController, SessionHandle, SessionSettings};
use mirrorplay::{EventBus, EventPayload, HttpStreamResolver};
use mockito::Server;
use serde_json::json;
use std::sync::Arc;

fn config_for(server: &Server, providers: &[&str]) -> Config {
    let mut config = Config::default();
    config.resolver.base_url = format!("{}/api", server.url());
    config.playback.providers = providers.iter().map(|p| p.to_string()).collect();
    config
}

fn spawn_session(config: &Config, surface: &RecordingSurface, bus: &EventBus) -> SessionHandle {
    let settings = SessionSettings::from_config(config).unwrap();
    let resolver = Arc::new(HttpStreamResolver::new(&config.resolver).unwrap());
    let (handle, controller) =
        SessionController::new(settings, resolver, surface.surface(), bus.clone());
    controller.spawn();
    handle
}

#[tokio::test]
async fn test_fails_over_to_first_working_provider() {
    let mut server = Server::new_async().await;
    mock_stream_missing(&mut server, "tt0111161", "auto").await;
    mock_stream(
        &mut server,
        "tt0111161",
        "vidsrc",
        500,
        json!({"success": false, "error": "Stream fetch failed: upstream timeout"}),
    )
    .await;
    mock_stream_ok(
        &mut server,
        "tt0111161",
        "mixdrop",
        "https://cdn.example/hls/master.m3u8",
    )
    .await;

    let config = config_for(&server, &["auto", "vidsrc", "mixdrop"]);
    let surface = RecordingSurface::with_levels(&[360, 1080, 720]);
    let bus = EventBus::from_config(&config);
    let handle = spawn_session(&config, &surface, &bus);
    let mut events = handle.subscribe();

    handle.start("tt0111161").await.unwrap();
    assert!(wait_for_state(&handle, PlaybackState::Attaching).await);
    assert!(surface.manifest_parsed());

    let ready = next_event(&mut events, |payload| {
        matches!(payload, EventPayload::Ready { .. })
    })
    .await
    .unwrap();
    assert_eq!(
        ready.payload,
        EventPayload::Ready {
            provider: ProviderName::new("mixdrop"),
            backend: BackendKind::AdaptiveBitrate,
        }
    );

    let info = handle.debug_info().await.unwrap();
    assert_eq!(info.state, PlaybackState::Playing);
    assert_eq!(info.retry_count, 0);

    let labels: Vec<String> = handle
        .quality_levels()
        .await
        .unwrap()
        .iter()
        .map(QualityEntry::label)
        .collect();
    assert_eq!(labels, vec!["Auto", "1080p", "720p", "360p"]);
    handle
        .select_quality(QualitySelection::Level(1))
        .await
        .unwrap();

    handle.destroy().await.unwrap();
    assert_eq!(surface.engines_alive(), 0);
}

#[tokio::test]
async fn test_reports_exhaustion_once() {
    let mut server = Server::new_async().await;
    for provider in ["auto", "vidsrc", "mixdrop"] {
        mock_stream_missing(&mut server, "tt404", provider).await;
    }

    let config = config_for(&server, &["auto", "vidsrc", "mixdrop"]);
    let surface = RecordingSurface::new();
    let bus = EventBus::from_config(&config);
    let handle = spawn_session(&config, &surface, &bus);
    let mut events = handle.subscribe();

    handle.start("tt404").await.unwrap();

    let fatal = next_event(&mut events, |payload| {
        matches!(payload, EventPayload::FatalError { .. })
    })
    .await
    .unwrap();
    match fatal.payload {
        EventPayload::FatalError { reason, failures } => {
            assert_eq!(failures.len(), 3);
            assert_eq!(
                reason,
                "All 3 providers failed: auto (No stream found), vidsrc (No stream found), \
                 mixdrop (No stream found)"
            );
        }
        other => panic!("unexpected payload {:?}", other),
    }

    assert_eq!(handle.state().await.unwrap(), PlaybackState::Exhausted);
    assert!(handle.retry().await.is_err());
}

#[tokio::test]
async fn test_embed_streams_load_through_proxy() {
    let mut server = Server::new_async().await;
    mock_stream(
        &mut server,
        "tt1",
        "auto",
        200,
        json!({"success": true, "stream_url": "https://vidsrc.example/embed/tt1", "type": "iframe"}),
    )
    .await;

    let config = config_for(&server, &["auto"]);
    let surface = RecordingSurface::new();
    let bus = EventBus::from_config(&config);
    let handle = spawn_session(&config, &surface, &bus);

    handle.start("tt1").await.unwrap();
    assert!(wait_for_state(&handle, PlaybackState::Attaching).await);

    let frame_url = surface.frame_url().unwrap();
    assert!(frame_url.starts_with(&format!("{}/api/proxy?url=https%3A%2F%2F", server.url())));

    assert!(surface.frame_loaded());
    assert!(wait_for_state(&handle, PlaybackState::Playing).await);
    let info = handle.debug_info().await.unwrap();
    assert_eq!(info.backend, Some(BackendKind::DelegatedEmbed));
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let mut server = Server::new_async().await;
    mock_stream_ok(&mut server, "tt1", "auto", "https://cdn.example/one.mp4").await;
    mock_stream_missing(&mut server, "tt2", "auto").await;

    let config = config_for(&server, &["auto"]);
    let bus = EventBus::from_config(&config);
    let first_surface = RecordingSurface::new();
    let second_surface = RecordingSurface::new();
    let first = spawn_session(&config, &first_surface, &bus);
    let second = spawn_session(&config, &second_surface, &bus);
    assert_ne!(first.session_id(), second.session_id());

    let mut second_events = second.subscribe();

    first.start("tt1").await.unwrap();
    second.start("tt2").await.unwrap();

    assert!(wait_for_state(&first, PlaybackState::Attaching).await);
    assert!(first_surface.can_play());
    assert!(wait_for_state(&first, PlaybackState::Playing).await);
    assert!(wait_for_state(&second, PlaybackState::Exhausted).await);

    // The filtered subscriber never sees the other session's events
    while let Ok(Some(event)) = second_events.try_recv() {
        assert_eq!(event.session_id, second.session_id());
    }
}
