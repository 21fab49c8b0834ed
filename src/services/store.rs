use crate::error::{AppError, Result};
use crate::models::{FeedbackEntry, PreferenceData, SessionRecord, TrackRating};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// How far back watched-URL history reaches when building the exclusion
/// list for a user.
const WATCHED_LOOKBACK_DAYS: i64 = 30;

/// Narrow persistence interface for feedback and session history. The
/// orchestration core only sees this trait.
#[async_trait]
pub trait MeditationStore: Send + Sync {
    async fn append_feedback(&self, entry: FeedbackEntry) -> Result<()>;
    async fn latest_feedback_at(&self, user_id: &str) -> Result<Option<DateTime<Utc>>>;
    async fn append_session(&self, record: SessionRecord) -> Result<()>;
    /// URLs this user has already been served recently.
    async fn watched_urls(&self, user_id: &str) -> Result<Vec<String>>;
    async fn preferences(&self) -> Result<PreferenceData>;
    async fn save_preferences(&self, preferences: PreferenceData) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    feedback_entries: Vec<FeedbackEntry>,
    track_ratings: HashMap<String, Vec<TrackRating>>,
    sessions: Vec<SessionRecord>,
    preference_data: PreferenceData,
}

/// JSON-file-backed store. The whole document is held in memory behind a
/// mutex and rewritten after each mutation; volumes here are a handful of
/// records per day.
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> anyhow::Result<Self> {
        let data = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("Store file unreadable ({}), starting fresh", e);
                StoreData::default()
            }),
            Err(_) => StoreData::default(),
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    async fn persist(&self, data: &StoreData) -> Result<()> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| AppError::Persistence(format!("failed to serialize store: {}", e)))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| AppError::Persistence(format!("failed to write store file: {}", e)))
    }
}

#[async_trait]
impl MeditationStore for JsonFileStore {
    async fn append_feedback(&self, entry: FeedbackEntry) -> Result<()> {
        let mut data = self.data.lock().await;

        data.track_ratings
            .entry(entry.track_id.clone())
            .or_default()
            .push(TrackRating {
                timestamp: entry.timestamp,
                rating: entry.responses.rating,
            });
        data.feedback_entries.push(entry);

        self.persist(&data).await
    }

    async fn latest_feedback_at(&self, user_id: &str) -> Result<Option<DateTime<Utc>>> {
        let data = self.data.lock().await;
        Ok(data
            .feedback_entries
            .iter()
            .rev()
            .find(|e| e.user_id == user_id)
            .map(|e| e.timestamp))
    }

    async fn append_session(&self, record: SessionRecord) -> Result<()> {
        let mut data = self.data.lock().await;
        data.sessions.push(record);
        self.persist(&data).await
    }

    async fn watched_urls(&self, user_id: &str) -> Result<Vec<String>> {
        let cutoff = Utc::now() - Duration::days(WATCHED_LOOKBACK_DAYS);
        let data = self.data.lock().await;
        Ok(data
            .sessions
            .iter()
            .filter(|s| s.created_at >= cutoff)
            .filter(|s| s.user_id.as_deref() == Some(user_id))
            .filter_map(|s| s.youtube_url.clone().or_else(|| s.audio_url.clone()))
            .collect())
    }

    async fn preferences(&self) -> Result<PreferenceData> {
        let data = self.data.lock().await;
        Ok(data.preference_data.clone())
    }

    async fn save_preferences(&self, preferences: PreferenceData) -> Result<()> {
        let mut data = self.data.lock().await;
        data.preference_data = preferences;
        self.persist(&data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeedbackSubmission, SourceInfo};

    fn source_info() -> SourceInfo {
        SourceInfo {
            title: "Calm Meditation".to_string(),
            artist: "YouTube Creator".to_string(),
            mood: "calm".to_string(),
            language: "english".to_string(),
            source_url: "https://www.youtube.com/watch?v=abc".to_string(),
            duration_secs: Some(600),
            provider: "openai".to_string(),
            fallback: false,
        }
    }

    fn entry(user_id: &str) -> FeedbackEntry {
        FeedbackEntry {
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            track_id: "https://www.youtube.com/watch?v=abc".to_string(),
            source: source_info(),
            responses: FeedbackSubmission {
                rating: 5,
                improved_mood: true,
                want_similar: true,
                suggestions: None,
                extra_answers: Default::default(),
            },
        }
    }

    #[tokio::test]
    async fn feedback_round_trips_through_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("feedback.json");

        {
            let store = JsonFileStore::new(path.clone()).expect("store");
            store.append_feedback(entry("user-1")).await.expect("append");
        }

        // A fresh store over the same file sees the entry.
        let store = JsonFileStore::new(path).expect("store");
        let latest = store.latest_feedback_at("user-1").await.expect("latest");
        assert!(latest.is_some());
        assert!(store
            .latest_feedback_at("user-2")
            .await
            .expect("latest")
            .is_none());
    }

    #[tokio::test]
    async fn watched_urls_are_scoped_to_the_user() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("feedback.json")).expect("store");

        store
            .append_session(SessionRecord {
                user_id: Some("user-1".to_string()),
                mood: "calm".to_string(),
                language: "english".to_string(),
                youtube_url: Some("https://www.youtube.com/watch?v=abc".to_string()),
                audio_url: None,
                created_at: Utc::now(),
            })
            .await
            .expect("append");

        let urls = store.watched_urls("user-1").await.expect("watched");
        assert_eq!(urls, vec!["https://www.youtube.com/watch?v=abc".to_string()]);
        assert!(store.watched_urls("user-2").await.expect("watched").is_empty());
    }
}
