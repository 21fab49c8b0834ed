use std::env;
use std::path::PathBuf;

/// Which pipeline variant the orchestrator drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Ask OpenAI for a YouTube meditation video URL.
    OpenAi,
    /// Search Archive.org / vetted URLs for an audio file, download and
    /// quality-check it.
    Archive,
    /// Generate a script with the LLM, review it, synthesize speech.
    Script,
}

impl SourceMode {
    fn parse(s: &str) -> Result<Self, anyhow::Error> {
        match s.to_lowercase().as_str() {
            "openai" | "youtube" => Ok(SourceMode::OpenAi),
            "archive" | "audio" => Ok(SourceMode::Archive),
            "script" | "tts" => Ok(SourceMode::Script),
            other => Err(anyhow::anyhow!(
                "Unknown MEDITATION_SOURCE '{}'. Expected one of: openai, archive, script",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub archive_base_url: String,
    pub source_mode: SourceMode,
    /// Directory downloaded and synthesized audio files land in.
    pub cache_dir: PathBuf,
    /// Cached files older than this are deleted by the sweeper.
    pub cache_max_age_days: u64,
    pub fallback_audio_path: PathBuf,
    pub fallback_youtube_url: String,
    /// Total attempts (initial try included) before the orchestrator gives
    /// up and serves the fallback asset.
    pub max_attempts: u32,
    /// Deadline applied to each finder/download/LLM call.
    pub call_timeout_secs: u64,
    pub min_duration_secs: f64,
    pub max_duration_secs: f64,
    pub min_bitrate_kbps: u32,
    pub min_sample_rate_hz: u32,
    pub silence_floor_dbfs: f64,
    pub feedback_data_path: PathBuf,
    /// Don't re-prompt a user for feedback within this many days.
    pub feedback_interval_days: i64,
    /// Probability of showing the form when the interval allows it.
    pub feedback_probability: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_host: "0.0.0.0".to_string(),
            server_port: 8000,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com".to_string(),
            archive_base_url: "https://archive.org".to_string(),
            source_mode: SourceMode::OpenAi,
            cache_dir: PathBuf::from("assets/cached_audio"),
            cache_max_age_days: 7,
            fallback_audio_path: PathBuf::from("assets/fallback_meditation.mp3"),
            fallback_youtube_url: "https://www.youtube.com/watch?v=O-6f5wQXSu8".to_string(),
            max_attempts: 3,
            call_timeout_secs: 30,
            min_duration_secs: 8.0 * 60.0,
            max_duration_secs: 15.0 * 60.0,
            min_bitrate_kbps: 64,
            min_sample_rate_hz: 22050,
            silence_floor_dbfs: -45.0,
            feedback_data_path: PathBuf::from("assets/feedback_data/meditation_feedback.json"),
            feedback_interval_days: 1,
            feedback_probability: 1.0,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let mut config = Config::default();

        if let Ok(host) = env::var("SERVER_HOST") {
            config.server_host = host;
        }
        if let Ok(port) = env::var("SERVER_PORT") {
            config.server_port = port.parse().unwrap_or(config.server_port);
        }
        if let Ok(mode) = env::var("MEDITATION_SOURCE") {
            config.source_mode = SourceMode::parse(&mode)?;
        }

        config.openai_api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        if config.openai_api_key.is_none() && config.source_mode != SourceMode::Archive {
            tracing::warn!(
                "OPENAI_API_KEY not set - meditation requests will be served from the fallback asset"
            );
        }

        if let Ok(url) = env::var("OPENAI_BASE_URL") {
            config.openai_base_url = url;
        }
        if let Ok(url) = env::var("ARCHIVE_BASE_URL") {
            config.archive_base_url = url;
        }
        if let Ok(dir) = env::var("AUDIO_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(days) = env::var("AUDIO_CACHE_MAX_AGE_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.cache_max_age_days = days;
        }
        if let Ok(path) = env::var("FALLBACK_AUDIO_PATH") {
            config.fallback_audio_path = PathBuf::from(path);
        }
        if let Ok(url) = env::var("FALLBACK_YOUTUBE_URL") {
            config.fallback_youtube_url = url;
        }
        if let Some(attempts) = env::var("MAX_ATTEMPTS").ok().and_then(|v| v.parse().ok()) {
            config.max_attempts = attempts;
        }
        if let Some(secs) = env::var("CALL_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()) {
            config.call_timeout_secs = secs;
        }
        if let Ok(path) = env::var("FEEDBACK_DATA_PATH") {
            config.feedback_data_path = PathBuf::from(path);
        }
        if let Some(days) = env::var("FEEDBACK_INTERVAL_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.feedback_interval_days = days;
        }
        if let Some(p) = env::var("FEEDBACK_PROBABILITY")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.feedback_probability = p;
        }

        Ok(config)
    }
}
