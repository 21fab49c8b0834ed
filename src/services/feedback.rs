use crate::config::Config;
use crate::error::Result;
use crate::models::{
    FeedbackEntry, FeedbackSubmission, PreferenceStats, Recommendations, SourceInfo,
};
use crate::services::store::MeditationStore;
use chrono::Utc;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

/// Decides when to prompt for feedback, produces the question list, and
/// turns submissions into stored entries plus aggregated preference data.
pub struct FeedbackCollector {
    store: Arc<dyn MeditationStore>,
    interval_days: i64,
    probability: f64,
}

const BASE_QUESTIONS: &[&str] = &[
    "How would you rate today's meditation from 1-5?",
    "Did this meditation help with your mood?",
    "Would you like more meditations like this one?",
    "What would make your meditation experience better?",
];

impl FeedbackCollector {
    pub fn new(store: Arc<dyn MeditationStore>, config: &Config) -> Self {
        Self {
            store,
            interval_days: config.feedback_interval_days,
            probability: config.feedback_probability.clamp(0.0, 1.0),
        }
    }

    /// Policy: prompt when the user has no feedback newer than the
    /// configured interval, damped by the configured probability.
    pub async fn should_show_feedback_form(&self, user_id: &str) -> bool {
        let due = match self.store.latest_feedback_at(user_id).await {
            Ok(Some(last)) => (Utc::now() - last).num_days() >= self.interval_days,
            Ok(None) => true,
            Err(e) => {
                tracing::warn!("Could not read feedback history: {:?}", e);
                true
            }
        };

        due && rand::thread_rng().gen_bool(self.probability)
    }

    pub fn questions(&self, source: Option<&SourceInfo>) -> Vec<String> {
        let mut questions: Vec<String> = BASE_QUESTIONS.iter().map(|q| q.to_string()).collect();

        if let Some(source) = source {
            questions.push(format!("Did you enjoy this meditation by {}?", source.artist));
            if let Some(duration_secs) = source.duration_secs {
                let minutes = (duration_secs as f64 / 60.0).round() as u32;
                questions.push(format!(
                    "Was {} minutes a good length for your meditation?",
                    minutes
                ));
            }
        }

        questions
    }

    /// Persist one feedback record. One record per submission, never updated.
    pub async fn save_feedback(
        &self,
        user_id: &str,
        submission: FeedbackSubmission,
        source: &SourceInfo,
    ) -> Result<()> {
        let entry = FeedbackEntry {
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            track_id: source.source_url.clone(),
            source: source.clone(),
            responses: submission,
        };

        self.store.append_feedback(entry).await
    }

    /// Secondary processing: fold the submission into the aggregated
    /// preference counters used for recommendations.
    pub async fn process_feedback(
        &self,
        submission: &FeedbackSubmission,
        source: &SourceInfo,
    ) -> Result<()> {
        let mut preferences = self.store.preferences().await?;

        let is_positive = submission.rating >= 4;
        let is_negative = submission.rating <= 2;

        let bump = |stats: &mut PreferenceStats| {
            stats.count += 1;
            if is_positive {
                stats.positive += 1;
            }
            if is_negative {
                stats.negative += 1;
            }
        };

        bump(preferences
            .preferred_moods
            .entry(source.mood.clone())
            .or_default());
        bump(preferences
            .preferred_artists
            .entry(source.artist.clone())
            .or_default());

        if let Some(duration_secs) = source.duration_secs {
            let minutes = (duration_secs as f64 / 60.0).round() as u32;
            let bucket = format!("{}-{}min", minutes, minutes + 1);
            bump(preferences.preferred_durations.entry(bucket).or_default());
        }

        self.store.save_preferences(preferences).await
    }

    pub async fn personalized_recommendations(&self) -> Result<Recommendations> {
        let preferences = self.store.preferences().await?;

        Ok(Recommendations {
            preferred_moods: top_by_positive(&preferences.preferred_moods),
            preferred_artists: top_by_positive(&preferences.preferred_artists),
            preferred_durations: top_by_positive(&preferences.preferred_durations),
        })
    }
}

fn top_by_positive(stats: &HashMap<String, PreferenceStats>) -> Vec<String> {
    let mut entries: Vec<(&String, &PreferenceStats)> = stats.iter().collect();
    entries.sort_by(|a, b| b.1.positive.cmp(&a.1.positive));
    entries.into_iter().take(3).map(|(k, _)| k.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::JsonFileStore;

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

    fn submission(rating: u8) -> FeedbackSubmission {
        FeedbackSubmission {
            rating,
            improved_mood: true,
            want_similar: true,
            suggestions: None,
            extra_answers: Default::default(),
        }
    }

    fn collector(dir: &tempfile::TempDir) -> FeedbackCollector {
        let store =
            Arc::new(JsonFileStore::new(dir.path().join("feedback.json")).expect("store"));
        FeedbackCollector::new(store, &Config::default())
    }

    #[tokio::test]
    async fn prompts_new_users_then_backs_off() {
        let dir = tempfile::tempdir().expect("tempdir");
        let collector = collector(&dir);

        assert!(collector.should_show_feedback_form("user-1").await);

        collector
            .save_feedback("user-1", submission(4), &source_info())
            .await
            .expect("save");

        assert!(!collector.should_show_feedback_form("user-1").await);
        // Other users are unaffected.
        assert!(collector.should_show_feedback_form("user-2").await);
    }

    #[tokio::test]
    async fn questions_include_track_specific_ones() {
        let dir = tempfile::tempdir().expect("tempdir");
        let collector = collector(&dir);

        let questions = collector.questions(Some(&source_info()));
        assert_eq!(questions.len(), BASE_QUESTIONS.len() + 2);
        assert!(questions.iter().any(|q| q.contains("YouTube Creator")));
        assert!(questions.iter().any(|q| q.contains("10 minutes")));

        assert_eq!(collector.questions(None).len(), BASE_QUESTIONS.len());
    }

    #[tokio::test]
    async fn positive_feedback_biases_recommendations() {
        let dir = tempfile::tempdir().expect("tempdir");
        let collector = collector(&dir);
        let source = source_info();

        collector
            .process_feedback(&submission(5), &source)
            .await
            .expect("process");
        collector
            .process_feedback(&submission(1), &source)
            .await
            .expect("process");

        let recommendations = collector
            .personalized_recommendations()
            .await
            .expect("recommendations");
        assert_eq!(recommendations.preferred_moods, vec!["calm".to_string()]);
        assert_eq!(recommendations.preferred_durations, vec!["10-11min".to_string()]);
    }
}
