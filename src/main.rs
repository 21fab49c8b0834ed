use daily_meditation::api::{self, AppState};
use daily_meditation::config::{Config, SourceMode};
use daily_meditation::services::{
    ArchiveFinder, AudioDownloader, FeedbackCollector, JsonFileStore, MeditationOrchestrator,
    MeditationStore, OpenAiClient, OpenAiFinder, PipelineVariant, QualityChecker, ScriptPipeline,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,daily_meditation=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    tokio::fs::create_dir_all(&config.cache_dir).await?;

    // Initialize services
    let store: Arc<dyn MeditationStore> =
        Arc::new(JsonFileStore::new(config.feedback_data_path.clone())?);
    let call_timeout = Duration::from_secs(config.call_timeout_secs);

    let downloader = Arc::new(AudioDownloader::new(config.cache_dir.clone(), call_timeout));
    let checker = Arc::new(QualityChecker::new(&config));
    let openai = OpenAiClient::new(
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
        call_timeout,
    );

    let variant = match config.source_mode {
        SourceMode::OpenAi => PipelineVariant::Video(Arc::new(OpenAiFinder::new(
            openai.clone(),
            config.cache_dir.join("openai_meditation_cache.json"),
        ))),
        SourceMode::Archive => PipelineVariant::Audio(Arc::new(ArchiveFinder::new(
            config.archive_base_url.clone(),
            call_timeout,
        ))),
        SourceMode::Script => PipelineVariant::Script(Arc::new(ScriptPipeline::new(
            openai.clone(),
            config.cache_dir.clone(),
        ))),
    };

    let orchestrator = Arc::new(MeditationOrchestrator::new(
        variant,
        downloader.clone(),
        checker,
        store.clone(),
        &config,
    ));
    let feedback = Arc::new(FeedbackCollector::new(store.clone(), &config));

    // Periodic cache sweep replaces the old external cleanup script
    let max_age = Duration::from_secs(config.cache_max_age_days * 24 * 60 * 60);
    let sweeper = downloader.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60 * 60));
        loop {
            interval.tick().await;
            match sweeper.sweep(max_age).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!("Swept {} stale cached audio files", removed),
                Err(e) => tracing::warn!("Cache sweep failed: {:?}", e),
            }
        }
    });

    let state = Arc::new(AppState {
        config: config.clone(),
        orchestrator,
        feedback,
        store,
        current_meditations: RwLock::new(HashMap::new()),
    });

    // Build router
    let app = api::router(state);

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
