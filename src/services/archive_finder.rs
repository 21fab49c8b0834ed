use crate::error::{AppError, Result};
use crate::models::FoundSource;
use crate::services::catalog;
use crate::services::finder::SourceFinder;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Finds meditation audio by trying the pre-vetted catalog URLs first, then
/// querying the Archive.org advancedsearch API for MP3 items whose duration
/// fits the meditation window.
pub struct ArchiveFinder {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    identifier: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemMetadata {
    #[serde(default)]
    files: Vec<ItemFile>,
}

#[derive(Debug, Deserialize)]
struct ItemFile {
    name: String,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    length: Option<String>,
}

/// Duration window applied when the item metadata carries a length. Items
/// without one are accepted and left to the quality checker.
const MIN_DURATION_SECS: f64 = 8.0 * 60.0;
const MAX_DURATION_SECS: f64 = 15.0 * 60.0;

impl ArchiveFinder {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("daily-meditation/0.1")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { base_url, client }
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchDoc>> {
        let url = format!("{}/advancedsearch.php", self.base_url);
        let q = format!("{} AND mediatype:(audio) AND format:(MP3)", query);
        let params = [
            ("q", q.as_str()),
            ("fl[]", "identifier"),
            ("fl[]", "title"),
            ("rows", "10"),
            ("page", "1"),
            ("output", "json"),
        ];

        tracing::debug!("Searching Archive.org: {} with query: {}", url, query);

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Archive.org request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Upstream(format!(
                "Archive.org search returned status: {}",
                status
            )));
        }

        let data: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Archive.org response: {}", e)))?;

        Ok(data.response.docs)
    }

    async fn first_mp3_url(&self, doc: &SearchDoc, excluded: &[String]) -> Result<Option<String>> {
        let url = format!("{}/metadata/{}", self.base_url, doc.identifier);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Archive.org metadata request failed: {}", e)))?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let metadata: ItemMetadata = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse item metadata: {}", e)))?;

        for file in &metadata.files {
            if !file.name.to_lowercase().ends_with(".mp3") {
                continue;
            }
            if let Some(format) = &file.format {
                if !format.to_uppercase().contains("MP3") {
                    continue;
                }
            }
            if let Some(length) = &file.length {
                if let Some(secs) = parse_length_secs(length) {
                    if !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&secs) {
                        continue;
                    }
                }
            }

            let download_url = format!(
                "{}/download/{}/{}",
                self.base_url,
                doc.identifier,
                file.name.replace(' ', "%20")
            );
            if excluded.contains(&download_url) {
                continue;
            }
            return Ok(Some(download_url));
        }

        Ok(None)
    }
}

#[async_trait]
impl SourceFinder for ArchiveFinder {
    async fn find(&self, mood: &str, language: &str, excluded: &[String]) -> Result<FoundSource> {
        let mood = mood.to_lowercase();
        let language = language.to_lowercase();

        // Pre-vetted known-good URLs win over any live search.
        for url in catalog::vetted_urls(&mood) {
            if !excluded.iter().any(|e| e == url) {
                tracing::info!(mood = %mood, "Using pre-vetted meditation URL");
                return Ok(FoundSource {
                    url: url.to_string(),
                    title: format!("{} meditation", mood),
                    provider: "vetted".to_string(),
                    duration_secs: None,
                });
            }
        }

        for query in catalog::queries_for(&mood, &language) {
            let docs = match self.search(&query).await {
                Ok(docs) => docs,
                Err(e) => {
                    tracing::warn!("Archive.org search failed for '{}': {:?}", query, e);
                    continue;
                }
            };

            for doc in &docs {
                match self.first_mp3_url(doc, excluded).await {
                    Ok(Some(url)) => {
                        tracing::info!("Found meditation audio on Archive.org: {}", url);
                        return Ok(FoundSource {
                            url,
                            title: doc
                                .title
                                .clone()
                                .unwrap_or_else(|| format!("{} meditation", mood)),
                            provider: "archive".to_string(),
                            duration_secs: None,
                        });
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!("Failed to inspect item {}: {:?}", doc.identifier, e);
                        continue;
                    }
                }
            }

            // Light rate limiting between queries.
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        Err(AppError::NotFound(format!(
            "No meditation audio found for mood '{}'",
            mood
        )))
    }
}

/// Archive item lengths come as raw seconds ("612.34") or as "mm:ss" /
/// "hh:mm:ss" strings.
fn parse_length_secs(length: &str) -> Option<f64> {
    let length = length.trim();
    if let Ok(secs) = length.parse::<f64>() {
        return Some(secs);
    }

    let parts: Vec<&str> = length.split(':').collect();
    match parts.as_slice() {
        [m, s] => {
            let minutes = m.parse::<f64>().ok()?;
            let seconds = s.parse::<f64>().ok()?;
            Some(minutes * 60.0 + seconds)
        }
        [h, m, s] => {
            let hours = h.parse::<f64>().ok()?;
            let minutes = m.parse::<f64>().ok()?;
            let seconds = s.parse::<f64>().ok()?;
            Some(hours * 3600.0 + minutes * 60.0 + seconds)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_raw_seconds() {
        assert_eq!(parse_length_secs("612.5"), Some(612.5));
    }

    #[test]
    fn parses_minute_second_format() {
        assert_eq!(parse_length_secs("10:30"), Some(630.0));
    }

    #[test]
    fn parses_hour_minute_second_format() {
        assert_eq!(parse_length_secs("1:02:03"), Some(3723.0));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_length_secs("ten minutes"), None);
    }
}
