use crate::api::middleware::Session;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{MeditationRequest, Playback, SourceInfo};
use crate::services::{catalog, FeedbackCollector, MeditationOrchestrator, MeditationStore};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use validator::Validate;

pub struct AppState {
    pub config: Config,
    pub orchestrator: Arc<MeditationOrchestrator>,
    pub feedback: Arc<FeedbackCollector>,
    pub store: Arc<dyn MeditationStore>,
    /// Most recently generated meditation per session, consumed by the
    /// feedback and completion endpoints.
    pub current_meditations: RwLock<HashMap<String, SourceInfo>>,
}

#[derive(Debug, Serialize)]
struct GenerateMeditationResponse {
    status: &'static str,
    mood: String,
    language: String,
    message: String,
    source_info: SourceInfo,
    should_show_feedback: bool,
    feedback_questions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    youtube_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct MoodsResponse {
    moods: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct LanguagesResponse {
    languages: Vec<&'static str>,
}

pub fn meditation_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/generate-meditation", post(generate_meditation))
        .route("/available-moods", get(available_moods))
        .route("/available-languages", get(available_languages))
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Welcome to the Daily Meditation API" }))
}

async fn generate_meditation(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(req): Json<MeditationRequest>,
) -> Result<Response> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let mood = req.mood.trim().to_lowercase();
    if !catalog::is_supported_mood(&mood) {
        return Err(AppError::Validation(format!(
            "Unsupported mood '{}'. See /available-moods for the supported list",
            mood
        )));
    }

    let language = req
        .language
        .as_deref()
        .map(|l| l.trim().to_lowercase())
        .unwrap_or_else(|| catalog::DEFAULT_LANGUAGE.to_string());
    if !catalog::is_supported_language(&language) {
        return Err(AppError::Validation(format!(
            "Unsupported language '{}'. See /available-languages for the supported list",
            language
        )));
    }

    tracing::info!(mood = %mood, language = %language, "Generating meditation");

    let meditation = state
        .orchestrator
        .generate(&mood, &language, Some(&session.user_id))
        .await;

    state
        .current_meditations
        .write()
        .await
        .insert(session.user_id.clone(), meditation.source.clone());

    let should_show_feedback = state
        .feedback
        .should_show_feedback_form(&session.user_id)
        .await;
    let feedback_questions = state.feedback.questions(Some(&meditation.source));

    let (youtube_url, audio_url) = match &meditation.playback {
        Playback::YouTube { url } => (Some(url.clone()), None),
        Playback::Audio { url, .. } => (None, Some(url.clone())),
    };

    let message = if meditation.source.fallback {
        "We couldn't find a fresh meditation right now, so here is a trusted favorite.".to_string()
    } else {
        "Your meditation is ready.".to_string()
    };

    let body = GenerateMeditationResponse {
        status: "success",
        mood,
        language,
        message,
        source_info: meditation.source,
        should_show_feedback,
        feedback_questions,
        youtube_url,
        audio_url,
    };

    let mut response = Json(body).into_response();
    session.apply_cookie(&mut response);
    Ok(response)
}

async fn available_moods() -> Json<MoodsResponse> {
    Json(MoodsResponse {
        moods: catalog::moods().to_vec(),
    })
}

async fn available_languages() -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        languages: catalog::languages().to_vec(),
    })
}
