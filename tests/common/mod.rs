#![allow(dead_code)]

use async_trait::async_trait;
use daily_meditation::api::AppState;
use daily_meditation::config::Config;
use daily_meditation::error::{AppError, Result as AppResult};
use daily_meditation::models::FoundSource;
use daily_meditation::services::{
    AudioDownloader, FeedbackCollector, JsonFileStore, MeditationOrchestrator, MeditationStore,
    PipelineVariant, QualityChecker, SourceFinder,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Finder that always succeeds with a fixed URL.
pub struct FixedFinder {
    pub url: String,
}

#[async_trait]
impl SourceFinder for FixedFinder {
    async fn find(
        &self,
        _mood: &str,
        _language: &str,
        _excluded: &[String],
    ) -> AppResult<FoundSource> {
        Ok(FoundSource {
            url: self.url.clone(),
            title: "Test Meditation".to_string(),
            provider: "openai".to_string(),
            duration_secs: Some(600),
        })
    }
}

/// Finder that never locates anything.
pub struct FailingFinder;

#[async_trait]
impl SourceFinder for FailingFinder {
    async fn find(
        &self,
        mood: &str,
        _language: &str,
        _excluded: &[String],
    ) -> AppResult<FoundSource> {
        Err(AppError::NotFound(format!("no source for '{}'", mood)))
    }
}

/// Finder that counts invocations and hands out a distinct URL each time.
pub struct CountingFinder {
    pub base_url: String,
    pub calls: Arc<AtomicU32>,
}

#[async_trait]
impl SourceFinder for CountingFinder {
    async fn find(
        &self,
        _mood: &str,
        _language: &str,
        _excluded: &[String],
    ) -> AppResult<FoundSource> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(FoundSource {
            url: format!("{}/audio.wav?attempt={}", self.base_url, attempt),
            title: "Test Meditation".to_string(),
            provider: "archive".to_string(),
            duration_secs: None,
        })
    }
}

/// Finder that records the exclusion list it was handed.
pub struct CapturingFinder {
    pub url: String,
    pub seen_excluded: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SourceFinder for CapturingFinder {
    async fn find(
        &self,
        _mood: &str,
        _language: &str,
        excluded: &[String],
    ) -> AppResult<FoundSource> {
        self.seen_excluded.lock().await.extend(excluded.iter().cloned());
        Ok(FoundSource {
            url: self.url.clone(),
            title: "Test Meditation".to_string(),
            provider: "openai".to_string(),
            duration_secs: Some(600),
        })
    }
}

/// Config rooted in a temp dir so tests never touch real caches.
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.cache_dir = dir.join("cache");
    config.feedback_data_path = dir.join("feedback.json");
    config.fallback_audio_path = dir.join("fallback.mp3");
    config.call_timeout_secs = 5;
    config
}

pub fn build_orchestrator(
    config: &Config,
    variant: PipelineVariant,
) -> (Arc<MeditationOrchestrator>, Arc<dyn MeditationStore>) {
    let store: Arc<dyn MeditationStore> =
        Arc::new(JsonFileStore::new(config.feedback_data_path.clone()).expect("store"));
    let downloader = Arc::new(AudioDownloader::new(
        config.cache_dir.clone(),
        Duration::from_secs(config.call_timeout_secs),
    ));
    let checker = Arc::new(QualityChecker::new(config));
    let orchestrator = Arc::new(MeditationOrchestrator::new(
        variant,
        downloader,
        checker,
        store.clone(),
        config,
    ));
    (orchestrator, store)
}

pub fn test_state(config: Config, variant: PipelineVariant) -> Arc<AppState> {
    std::fs::write(&config.fallback_audio_path, b"fallback audio").expect("fallback asset");
    let (orchestrator, store) = build_orchestrator(&config, variant);
    let feedback = Arc::new(FeedbackCollector::new(store.clone(), &config));

    Arc::new(AppState {
        config,
        orchestrator,
        feedback,
        store,
        current_meditations: RwLock::new(HashMap::new()),
    })
}

/// An in-memory WAV file: mono, 16-bit, a 220 Hz sine at the given
/// amplitude (0.0 gives pure silence).
pub fn wav_bytes(duration_secs: u32, sample_rate: u32, amplitude: f32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        let n = duration_secs * sample_rate;
        for i in 0..n {
            let t = i as f32 / sample_rate as f32;
            let value = (t * 220.0 * std::f32::consts::TAU).sin() * amplitude;
            writer
                .write_sample((value * i16::MAX as f32) as i16)
                .expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}
