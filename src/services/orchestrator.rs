use crate::config::Config;
use crate::error::AppError;
use crate::models::{FoundSource, GeneratedMeditation, Playback, SourceInfo};
use crate::services::downloader::AudioDownloader;
use crate::services::finder::SourceFinder;
use crate::services::quality::QualityChecker;
use crate::services::script_pipeline::ScriptPipeline;
use crate::services::store::MeditationStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Which pipeline the orchestrator runs, selected by configuration.
pub enum PipelineVariant {
    /// Find a video URL; no download or quality check applies.
    Video(Arc<dyn SourceFinder>),
    /// Find an audio URL, download it, quality-check the file.
    Audio(Arc<dyn SourceFinder>),
    /// Generate a script, review it, synthesize speech, quality-check.
    Script(Arc<ScriptPipeline>),
}

/// Top-level coordinator. Runs SEARCHING -> DOWNLOADING -> CHECKING with a
/// bounded retry budget, and serves the bundled fallback asset when the
/// budget is exhausted or an upstream failure cuts the run short - the
/// caller always receives a playable result.
pub struct MeditationOrchestrator {
    variant: PipelineVariant,
    downloader: Arc<AudioDownloader>,
    checker: Arc<QualityChecker>,
    store: Arc<dyn MeditationStore>,
    max_attempts: u32,
    call_timeout: Duration,
    fallback_audio_path: PathBuf,
    fallback_youtube_url: String,
}

impl MeditationOrchestrator {
    pub fn new(
        variant: PipelineVariant,
        downloader: Arc<AudioDownloader>,
        checker: Arc<QualityChecker>,
        store: Arc<dyn MeditationStore>,
        config: &Config,
    ) -> Self {
        Self {
            variant,
            downloader,
            checker,
            store,
            max_attempts: config.max_attempts.max(1),
            call_timeout: Duration::from_secs(config.call_timeout_secs),
            fallback_audio_path: config.fallback_audio_path.clone(),
            fallback_youtube_url: config.fallback_youtube_url.clone(),
        }
    }

    /// Generate a meditation for the mood/language. Infallible by design:
    /// every anticipated failure funnels into the fallback asset.
    pub async fn generate(
        &self,
        mood: &str,
        language: &str,
        user_id: Option<&str>,
    ) -> GeneratedMeditation {
        let watched = match user_id {
            Some(user_id) => self.store.watched_urls(user_id).await.unwrap_or_else(|e| {
                tracing::warn!("Could not load watched history: {:?}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        match &self.variant {
            PipelineVariant::Video(finder) => self.video_flow(finder, mood, language, watched).await,
            PipelineVariant::Audio(finder) => self.audio_flow(finder, mood, language, watched).await,
            PipelineVariant::Script(pipeline) => self.script_flow(pipeline, mood, language).await,
        }
    }

    async fn video_flow(
        &self,
        finder: &Arc<dyn SourceFinder>,
        mood: &str,
        language: &str,
        watched: Vec<String>,
    ) -> GeneratedMeditation {
        tracing::info!(mood = %mood, language = %language, "Searching for a meditation video");

        match timeout(self.call_timeout, finder.find(mood, language, &watched)).await {
            Ok(Ok(found)) => {
                tracing::info!("Found meditation video: {}", found.url);
                GeneratedMeditation {
                    source: self.source_info(&found, mood, language, found.duration_secs),
                    playback: Playback::YouTube { url: found.url },
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Video search failed: {:?}", e);
                self.fallback(mood, language)
            }
            Err(_) => {
                tracing::error!("Video search timed out after {:?}", self.call_timeout);
                self.fallback(mood, language)
            }
        }
    }

    async fn audio_flow(
        &self,
        finder: &Arc<dyn SourceFinder>,
        mood: &str,
        language: &str,
        mut excluded: Vec<String>,
    ) -> GeneratedMeditation {
        for attempt in 1..=self.max_attempts {
            // SEARCHING
            tracing::info!(attempt, mood = %mood, "Searching for meditation audio");
            let found = match timeout(self.call_timeout, finder.find(mood, language, &excluded))
                .await
            {
                Ok(Ok(found)) => found,
                Ok(Err(AppError::NotFound(msg))) => {
                    tracing::warn!("No source located ({}), using fallback", msg);
                    return self.fallback(mood, language);
                }
                Ok(Err(e)) => {
                    tracing::error!("Search failed: {:?}", e);
                    return self.fallback(mood, language);
                }
                Err(_) => {
                    tracing::error!("Search timed out after {:?}", self.call_timeout);
                    return self.fallback(mood, language);
                }
            };

            // DOWNLOADING - never hard-fails before the quality check; a
            // failed transfer leaves a placeholder the checker will reject.
            let path = match self.downloader.download(&found.url, mood, language).await {
                Ok(path) => path,
                Err(e) => {
                    tracing::error!("Downloader could not produce a file: {:?}", e);
                    return self.fallback(mood, language);
                }
            };

            // CHECKING
            let report = self.checker.check(&path).await;
            if report.passed {
                return self.audio_result(&path, &found, mood, language, report.duration_secs);
            }

            tracing::warn!(
                attempt,
                reasons = ?report.reasons,
                "Quality check failed for {}",
                found.url
            );
            excluded.push(found.url);
            // RETRY -> SEARCHING
        }

        tracing::warn!(
            "Retry budget ({}) exhausted for mood '{}', using fallback",
            self.max_attempts,
            mood
        );
        self.fallback(mood, language)
    }

    async fn script_flow(
        &self,
        pipeline: &Arc<ScriptPipeline>,
        mood: &str,
        language: &str,
    ) -> GeneratedMeditation {
        for attempt in 1..=self.max_attempts {
            tracing::info!(attempt, mood = %mood, "Running script generation pipeline");

            let script = match timeout(self.call_timeout, pipeline.generate_script(mood, language))
                .await
            {
                Ok(Ok(script)) => script,
                Ok(Err(e)) => {
                    tracing::error!("Script generation failed: {:?}", e);
                    return self.fallback(mood, language);
                }
                Err(_) => {
                    tracing::error!("Script generation timed out");
                    return self.fallback(mood, language);
                }
            };

            // A failed review is not fatal; the unrevised script still reads
            // fine, so fall back to it.
            let script = match timeout(self.call_timeout, pipeline.review_script(&script, mood))
                .await
            {
                Ok(Ok(revised)) => revised,
                Ok(Err(e)) => {
                    tracing::warn!("Script review failed, using unrevised script: {:?}", e);
                    script
                }
                Err(_) => {
                    tracing::warn!("Script review timed out, using unrevised script");
                    script
                }
            };

            let path = match timeout(
                self.call_timeout,
                pipeline.synthesize(&script, mood, language),
            )
            .await
            {
                Ok(Ok(path)) => path,
                Ok(Err(e)) => {
                    tracing::error!("Speech synthesis failed: {:?}", e);
                    return self.fallback(mood, language);
                }
                Err(_) => {
                    tracing::error!("Speech synthesis timed out");
                    return self.fallback(mood, language);
                }
            };

            let report = self.checker.check(&path).await;
            if report.passed {
                let found = FoundSource {
                    url: format!("/audio/{}", file_name(&path)),
                    title: format!("Guided {} meditation", mood),
                    provider: "script".to_string(),
                    duration_secs: None,
                };
                return self.audio_result(&path, &found, mood, language, report.duration_secs);
            }

            tracing::warn!(attempt, reasons = ?report.reasons, "Synthesized audio failed quality check");
        }

        self.fallback(mood, language)
    }

    fn audio_result(
        &self,
        path: &Path,
        found: &FoundSource,
        mood: &str,
        language: &str,
        duration_secs: f64,
    ) -> GeneratedMeditation {
        let url = format!("/audio/{}", file_name(path));
        GeneratedMeditation {
            source: self.source_info(found, mood, language, Some(duration_secs as u32)),
            playback: Playback::Audio {
                path: path.to_path_buf(),
                url,
            },
        }
    }

    fn source_info(
        &self,
        found: &FoundSource,
        mood: &str,
        language: &str,
        duration_secs: Option<u32>,
    ) -> SourceInfo {
        SourceInfo {
            title: found.title.clone(),
            artist: artist_for(&found.provider),
            mood: mood.to_string(),
            language: language.to_string(),
            source_url: found.url.clone(),
            duration_secs,
            provider: found.provider.clone(),
            fallback: false,
        }
    }

    /// The guaranteed exit: a fixed, always-available asset with metadata
    /// marking it as a fallback.
    fn fallback(&self, mood: &str, language: &str) -> GeneratedMeditation {
        let (playback, title, source_url) = match &self.variant {
            PipelineVariant::Video(_) => (
                Playback::YouTube {
                    url: self.fallback_youtube_url.clone(),
                },
                "Fallback Meditation Video".to_string(),
                self.fallback_youtube_url.clone(),
            ),
            PipelineVariant::Audio(_) | PipelineVariant::Script(_) => (
                Playback::Audio {
                    path: self.fallback_audio_path.clone(),
                    url: "/fallback.mp3".to_string(),
                },
                "Fallback Meditation".to_string(),
                "/fallback.mp3".to_string(),
            ),
        };

        GeneratedMeditation {
            source: SourceInfo {
                title,
                artist: "Daily Meditation".to_string(),
                mood: mood.to_string(),
                language: language.to_string(),
                source_url,
                duration_secs: Some(600),
                provider: "fallback".to_string(),
                fallback: true,
            },
            playback,
        }
    }
}

fn artist_for(provider: &str) -> String {
    match provider {
        "openai" => "YouTube Creator".to_string(),
        "archive" | "vetted" => "Archive.org".to_string(),
        "script" => "Daily Meditation".to_string(),
        _ => "Unknown".to_string(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("meditation.mp3")
        .to_string()
}
