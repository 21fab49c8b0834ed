use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MeditationRequest {
    #[validate(length(min = 1, max = 64))]
    pub mood: String,
    #[validate(length(min = 1, max = 32))]
    pub language: Option<String>,
}

/// A candidate resource located by a `SourceFinder`, before download and
/// quality checking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoundSource {
    pub url: String,
    pub title: String,
    /// Which finder produced this ("openai", "archive", "vetted", "script").
    pub provider: String,
    /// Duration hint from the source page/API, when one was available.
    pub duration_secs: Option<u32>,
}

/// Metadata about the meditation served to the client. One per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub title: String,
    pub artist: String,
    pub mood: String,
    pub language: String,
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
    pub provider: String,
    pub fallback: bool,
}

/// How the client should play the result.
#[derive(Debug, Clone)]
pub enum Playback {
    YouTube { url: String },
    Audio { path: PathBuf, url: String },
}

#[derive(Debug, Clone)]
pub struct GeneratedMeditation {
    pub playback: Playback,
    pub source: SourceInfo,
}

/// Outcome of inspecting a downloaded audio file. A failing report is a
/// normal result consumed by the retry policy, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub passed: bool,
    pub duration_secs: f64,
    pub bitrate_kbps: u32,
    pub sample_rate_hz: u32,
    pub volume_dbfs: f64,
    pub reasons: Vec<String>,
}

impl QualityReport {
    pub fn failed(reason: impl Into<String>) -> Self {
        QualityReport {
            passed: false,
            duration_secs: 0.0,
            bitrate_kbps: 0,
            sample_rate_hz: 0,
            volume_dbfs: f64::NEG_INFINITY,
            reasons: vec![reason.into()],
        }
    }
}
