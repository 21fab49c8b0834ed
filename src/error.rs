use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No source found: {0}")]
    NotFound(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Download(ref e) => {
                tracing::error!("Download error: {}", e);
                (StatusCode::BAD_GATEWAY, "Download failed".to_string())
            }
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Persistence(ref e) => {
                tracing::error!("Persistence error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to save data".to_string(),
                )
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
