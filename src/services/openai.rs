use crate::error::{AppError, Result};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Thin typed client for the two OpenAI endpoints the pipeline uses:
/// chat completions (finding videos, writing and reviewing scripts) and
/// speech synthesis.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct SpeechRequest {
    model: String,
    input: String,
    voice: String,
    response_format: String,
    speed: f32,
}

impl OpenAiClient {
    pub fn new(api_key: Option<String>, base_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            base_url,
            client,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::Upstream("OPENAI_API_KEY not configured".to_string()))
    }

    pub async fn chat(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let api_key = self.api_key()?;

        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens,
            temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("OpenAI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "OpenAI API error {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse OpenAI response: {}", e)))?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| AppError::Upstream("OpenAI returned no choices".to_string()))
    }

    /// Synthesize speech for a script. Returns raw MP3 bytes.
    pub async fn speech(&self, input: &str, voice: &str) -> Result<Bytes> {
        let api_key = self.api_key()?;

        let request = SpeechRequest {
            model: "tts-1".to_string(),
            input: input.to_string(),
            voice: voice.to_string(),
            response_format: "mp3".to_string(),
            // Slow delivery suits guided meditation.
            speed: 0.85,
        };

        let response = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("OpenAI TTS request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "OpenAI TTS error {}: {}",
                status, body
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to read TTS audio: {}", e)))
    }
}
