use crate::api::meditation::AppState;
use crate::api::middleware::Session;
use crate::error::{AppError, Result};
use crate::models::{FeedbackSubmission, SessionRecord, SourceInfo};
use crate::services::catalog;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    message: &'static str,
}

pub fn feedback_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/submit-feedback", post(submit_feedback))
        .route("/complete-meditation", post(complete_meditation))
}

async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(submission): Json<FeedbackSubmission>,
) -> Result<Response> {
    submission
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    // Feedback refers to the session's most recent meditation; a session
    // without one (e.g. a freshly issued cookie) still gets its feedback
    // recorded against a placeholder context.
    let source = state
        .current_meditations
        .read()
        .await
        .get(&session.user_id)
        .cloned()
        .unwrap_or_else(unknown_source);

    state
        .feedback
        .save_feedback(&session.user_id, submission.clone(), &source)
        .await?;

    if let Err(e) = state.feedback.process_feedback(&submission, &source).await {
        tracing::warn!("Feedback post-processing failed: {:?}", e);
    }

    let mut response = Json(StatusResponse {
        status: "success",
        message: "Feedback saved",
    })
    .into_response();
    session.apply_cookie(&mut response);
    Ok(response)
}

/// Record that the session's meditation was actually watched/listened to.
/// Best-effort: a persistence failure is logged, not surfaced.
async fn complete_meditation(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Response> {
    let source = state
        .current_meditations
        .read()
        .await
        .get(&session.user_id)
        .cloned();

    let body = match source {
        Some(source) => {
            let is_video = source.source_url.contains("youtube.com")
                || source.source_url.contains("youtu.be");
            let record = SessionRecord {
                user_id: Some(session.user_id.clone()),
                mood: source.mood.clone(),
                language: source.language.clone(),
                youtube_url: is_video.then(|| source.source_url.clone()),
                audio_url: (!is_video).then(|| source.source_url.clone()),
                created_at: Utc::now(),
            };

            match state.store.append_session(record).await {
                Ok(()) => StatusResponse {
                    status: "success",
                    message: "Meditation recorded",
                },
                Err(e) => {
                    tracing::error!("Failed to record completed meditation: {:?}", e);
                    StatusResponse {
                        status: "error",
                        message: "Could not record the meditation",
                    }
                }
            }
        }
        None => StatusResponse {
            status: "ignored",
            message: "No meditation to record for this session",
        },
    };

    let mut response = Json(body).into_response();
    session.apply_cookie(&mut response);
    Ok(response)
}

fn unknown_source() -> SourceInfo {
    SourceInfo {
        title: "Unknown Meditation".to_string(),
        artist: "Unknown".to_string(),
        mood: "unknown".to_string(),
        language: catalog::DEFAULT_LANGUAGE.to_string(),
        source_url: "unknown".to_string(),
        duration_secs: None,
        provider: "unknown".to_string(),
        fallback: false,
    }
}
