use crate::error::{AppError, Result};
use crate::models::FoundSource;
use crate::services::finder::SourceFinder;
use crate::services::openai::OpenAiClient;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Finds YouTube meditation videos by asking OpenAI for a URL matching the
/// mood and language. Responses are cached per mood/language so repeat
/// requests don't burn tokens.
pub struct OpenAiFinder {
    client: OpenAiClient,
    cache_path: PathBuf,
    cache: Mutex<HashMap<String, CachedFind>>,
    url_pattern: Regex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedFind {
    youtube_url: String,
    title: String,
}

const SYSTEM_PROMPT: &str =
    "Return only a YouTube URL for meditation videos (8-15 min). No other text.";

impl OpenAiFinder {
    pub fn new(client: OpenAiClient, cache_path: PathBuf) -> Self {
        let cache = Self::load_cache(&cache_path);

        Self {
            client,
            cache_path,
            cache: Mutex::new(cache),
            url_pattern: Regex::new(
                r"https?://(?:www\.)?(?:youtube\.com/watch\?v=|youtu\.be/)[A-Za-z0-9_-]+",
            )
            .unwrap(),
        }
    }

    fn load_cache(path: &PathBuf) -> HashMap<String, CachedFind> {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable finder cache: {}", e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }

    async fn persist_cache(&self, cache: &HashMap<String, CachedFind>) {
        if let Some(parent) = self.cache_path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!("Failed to create cache directory: {}", e);
                return;
            }
        }
        match serde_json::to_string_pretty(cache) {
            Ok(json) => {
                if let Err(e) = tokio::fs::write(&self.cache_path, json).await {
                    tracing::warn!("Failed to persist finder cache: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize finder cache: {}", e),
        }
    }

    /// Pull a YouTube URL out of the model's reply: a bare URL, a URL
    /// embedded in prose, or a JSON object with a url field.
    fn extract_youtube_url(&self, text: &str) -> Option<String> {
        let trimmed = text.trim();
        if trimmed.starts_with("http")
            && (trimmed.contains("youtube.com") || trimmed.contains("youtu.be"))
            && !trimmed.contains(char::is_whitespace)
        {
            return Some(trimmed.to_string());
        }

        if let Some(m) = self.url_pattern.find(text) {
            return Some(m.as_str().to_string());
        }

        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            for key in ["youtube_url", "url"] {
                if let Some(url) = value.get(key).and_then(|v| v.as_str()) {
                    if url.contains("youtube.com") || url.contains("youtu.be") {
                        return Some(url.to_string());
                    }
                }
            }
        }

        None
    }

    fn title_for(mood: &str) -> String {
        let mut chars = mood.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        };
        format!("{} Meditation", capitalized)
    }
}

#[async_trait]
impl SourceFinder for OpenAiFinder {
    async fn find(&self, mood: &str, language: &str, excluded: &[String]) -> Result<FoundSource> {
        let mood = mood.to_lowercase();
        let language = language.to_lowercase();
        let cache_key = format!("{}_{}", mood, language);

        {
            let cache = self.cache.lock().await;
            if let Some(cached) = cache.get(&cache_key) {
                if !excluded.contains(&cached.youtube_url) {
                    tracing::info!(mood = %mood, language = %language, "Using cached meditation video");
                    return Ok(FoundSource {
                        url: cached.youtube_url.clone(),
                        title: cached.title.clone(),
                        provider: "openai".to_string(),
                        duration_secs: None,
                    });
                }
            }
        }

        let mut prompt = format!(
            "Find YouTube meditation video: 8-15 minutes, {} mood, {} language. URL only.",
            mood, language
        );
        if !excluded.is_empty() {
            prompt.push_str("\nDo not suggest any of these URLs: ");
            prompt.push_str(&excluded.join(", "));
        }

        tracing::info!(mood = %mood, language = %language, "Asking OpenAI for a meditation video");
        let reply = self.client.chat(SYSTEM_PROMPT, &prompt, 60, 0.7).await?;

        let url = self.extract_youtube_url(&reply).ok_or_else(|| {
            AppError::Upstream(format!("OpenAI reply did not contain a YouTube URL: {}", reply))
        })?;

        let title = Self::title_for(&mood);

        let mut cache = self.cache.lock().await;
        cache.insert(
            cache_key,
            CachedFind {
                youtube_url: url.clone(),
                title: title.clone(),
            },
        );
        self.persist_cache(&cache).await;

        Ok(FoundSource {
            url,
            title,
            provider: "openai".to_string(),
            duration_secs: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn finder() -> OpenAiFinder {
        let client = OpenAiClient::new(None, "http://unused".to_string(), Duration::from_secs(1));
        OpenAiFinder::new(client, PathBuf::from("/tmp/nonexistent-cache.json"))
    }

    #[test]
    fn extracts_bare_url() {
        let f = finder();
        assert_eq!(
            f.extract_youtube_url("https://www.youtube.com/watch?v=O-6f5wQXSu8"),
            Some("https://www.youtube.com/watch?v=O-6f5wQXSu8".to_string())
        );
    }

    #[test]
    fn extracts_url_from_prose() {
        let f = finder();
        assert_eq!(
            f.extract_youtube_url("Here you go: https://youtu.be/abc_123 enjoy!"),
            Some("https://youtu.be/abc_123".to_string())
        );
    }

    #[test]
    fn extracts_url_from_json_reply() {
        let f = finder();
        assert_eq!(
            f.extract_youtube_url(r#"{"youtube_url": "https://www.youtube.com/watch?v=xyz"}"#),
            Some("https://www.youtube.com/watch?v=xyz".to_string())
        );
    }

    #[test]
    fn rejects_non_youtube_reply() {
        let f = finder();
        assert_eq!(f.extract_youtube_url("I cannot find a video."), None);
        assert_eq!(f.extract_youtube_url("https://example.com/video"), None);
    }
}
