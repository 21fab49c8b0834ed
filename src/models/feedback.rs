use crate::models::SourceInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FeedbackSubmission {
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    pub improved_mood: bool,
    pub want_similar: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra_answers: HashMap<String, String>,
}

/// One stored feedback record. Create-on-submit, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    /// The source URL doubles as the track identifier.
    pub track_id: String,
    pub source: SourceInfo,
    pub responses: FeedbackSubmission,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRating {
    pub timestamp: DateTime<Utc>,
    pub rating: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceStats {
    pub count: u32,
    pub positive: u32,
    pub negative: u32,
}

/// Aggregated preference counters, updated as feedback arrives and used to
/// bias future recommendations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceData {
    pub preferred_moods: HashMap<String, PreferenceStats>,
    pub preferred_artists: HashMap<String, PreferenceStats>,
    pub preferred_durations: HashMap<String, PreferenceStats>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Recommendations {
    pub preferred_moods: Vec<String>,
    pub preferred_artists: Vec<String>,
    pub preferred_durations: Vec<String>,
}

/// A completed meditation, recorded when the client reports it was watched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: Option<String>,
    pub mood: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
