pub mod feedback;
pub mod meditation;
pub mod middleware;

pub use feedback::feedback_routes;
pub use meditation::{meditation_routes, AppState};

use axum::{
    http::{header, Method},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

/// Build the full application router: API routes, static serving for cached
/// audio and the bundled fallback asset, and the middleware stack.
pub fn router(state: Arc<AppState>) -> Router {
    let cache_dir = state.config.cache_dir.clone();
    let fallback_asset = state.config.fallback_audio_path.clone();

    Router::new()
        .merge(meditation_routes())
        .merge(feedback_routes())
        .with_state(state)
        .nest_service("/audio", ServeDir::new(cache_dir))
        .route_service("/fallback.mp3", ServeFile::new(fallback_asset))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE]),
        )
}
