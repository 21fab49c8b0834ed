mod common;

use common::{
    build_orchestrator, test_config, wav_bytes, CapturingFinder, CountingFinder, FailingFinder,
    FixedFinder,
};
use daily_meditation::models::{Playback, SessionRecord};
use daily_meditation::services::PipelineVariant;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn retry_budget_is_bounded_before_fallback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());

    // Every download succeeds but the audio is silent, so every quality
    // check fails and the orchestrator must retry.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/audio.wav"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(wav_bytes(5, 22050, 0.0), "audio/wav"),
        )
        .mount(&server)
        .await;

    let calls = Arc::new(AtomicU32::new(0));
    let finder = CountingFinder {
        base_url: server.uri(),
        calls: calls.clone(),
    };

    let (orchestrator, _store) =
        build_orchestrator(&config, PipelineVariant::Audio(Arc::new(finder)));

    let meditation = orchestrator.generate("calm", "english", None).await;

    assert_eq!(
        calls.load(Ordering::SeqCst),
        config.max_attempts,
        "search attempts must stop at the configured budget"
    );
    assert!(meditation.source.fallback);
    match meditation.playback {
        Playback::Audio { url, .. } => assert_eq!(url, "/fallback.mp3"),
        Playback::YouTube { .. } => panic!("audio pipeline must fall back to the bundled asset"),
    }
}

#[tokio::test]
async fn not_found_goes_straight_to_fallback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());

    let (orchestrator, _store) =
        build_orchestrator(&config, PipelineVariant::Audio(Arc::new(FailingFinder)));

    let meditation = orchestrator.generate("calm", "english", None).await;

    assert!(meditation.source.fallback);
    assert_eq!(meditation.source.mood, "calm");
}

#[tokio::test]
async fn passing_audio_is_downloaded_and_served() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = test_config(dir.path());
    // Short fixture; the duration window is injected configuration.
    config.min_duration_secs = 1.0;

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/audio.wav"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(wav_bytes(5, 22050, 0.5), "audio/wav"),
        )
        .mount(&server)
        .await;

    let finder = FixedFinder {
        url: format!("{}/audio.wav", server.uri()),
    };
    let (orchestrator, _store) =
        build_orchestrator(&config, PipelineVariant::Audio(Arc::new(finder)));

    let meditation = orchestrator.generate("calm", "english", None).await;

    assert!(!meditation.source.fallback);
    match meditation.playback {
        Playback::Audio { path, url } => {
            assert!(path.exists(), "downloaded file must be on disk");
            assert!(url.starts_with("/audio/calm_english_"));
        }
        Playback::YouTube { .. } => panic!("audio pipeline must serve a local file"),
    }
    assert_eq!(meditation.source.provider, "openai");
    assert!(meditation.source.duration_secs.is_some());
}

#[tokio::test]
async fn failed_download_leaves_placeholder_and_falls_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());

    // The server refuses every request; the downloader writes placeholders
    // that the checker rejects, exhausting the budget.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let calls = Arc::new(AtomicU32::new(0));
    let finder = CountingFinder {
        base_url: server.uri(),
        calls: calls.clone(),
    };
    let (orchestrator, _store) =
        build_orchestrator(&config, PipelineVariant::Audio(Arc::new(finder)));

    let meditation = orchestrator.generate("calm", "english", None).await;

    assert!(meditation.source.fallback);
    assert_eq!(calls.load(Ordering::SeqCst), config.max_attempts);

    // The never-hard-fail policy: each attempt left a file behind.
    let cached: Vec<_> = std::fs::read_dir(&config.cache_dir)
        .expect("cache dir")
        .collect();
    assert_eq!(cached.len(), config.max_attempts as usize);
}

#[tokio::test]
async fn video_mode_returns_the_found_url() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());

    let finder = FixedFinder {
        url: "https://www.youtube.com/watch?v=abc123".to_string(),
    };
    let (orchestrator, _store) =
        build_orchestrator(&config, PipelineVariant::Video(Arc::new(finder)));

    let meditation = orchestrator.generate("calm", "english", None).await;

    assert!(!meditation.source.fallback);
    match meditation.playback {
        Playback::YouTube { url } => {
            assert_eq!(url, "https://www.youtube.com/watch?v=abc123")
        }
        Playback::Audio { .. } => panic!("video pipeline must return a video URL"),
    }
}

#[tokio::test]
async fn watched_history_is_passed_to_the_finder() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());

    let seen_excluded = Arc::new(Mutex::new(Vec::new()));
    let finder = CapturingFinder {
        url: "https://www.youtube.com/watch?v=fresh".to_string(),
        seen_excluded: seen_excluded.clone(),
    };
    let (orchestrator, store) =
        build_orchestrator(&config, PipelineVariant::Video(Arc::new(finder)));

    store
        .append_session(SessionRecord {
            user_id: Some("user-1".to_string()),
            mood: "calm".to_string(),
            language: "english".to_string(),
            youtube_url: Some("https://www.youtube.com/watch?v=seen".to_string()),
            audio_url: None,
            created_at: chrono::Utc::now(),
        })
        .await
        .expect("session");

    let meditation = orchestrator.generate("calm", "english", Some("user-1")).await;

    assert!(!meditation.source.fallback);
    let excluded = seen_excluded.lock().await;
    assert!(
        excluded.contains(&"https://www.youtube.com/watch?v=seen".to_string()),
        "previously watched URLs must reach the finder"
    );
}

#[tokio::test]
async fn identical_downloads_reuse_the_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = test_config(dir.path());
    config.min_duration_secs = 1.0;

    let server = MockServer::start().await;
    let hits = Mock::given(method("GET"))
        .and(path("/audio.wav"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(wav_bytes(5, 22050, 0.5), "audio/wav"),
        )
        .expect(1)
        .mount_as_scoped(&server)
        .await;

    let finder = FixedFinder {
        url: format!("{}/audio.wav", server.uri()),
    };
    let (orchestrator, _store) =
        build_orchestrator(&config, PipelineVariant::Audio(Arc::new(finder)));

    let first = orchestrator.generate("calm", "english", None).await;
    let second = orchestrator.generate("calm", "english", None).await;

    assert!(!first.source.fallback);
    assert!(!second.source.fallback);
    drop(hits); // verifies the expected single upstream fetch
}
