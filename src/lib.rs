pub mod capture;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod normalize;
pub mod playback;
pub mod relay;
pub mod services;

use crate::handlers::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn create_app(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = app_state.config.max_request_size_bytes();

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/sentences", get(handlers::sentences))
        .route("/api/translate", post(handlers::translate))
        .route("/api/transcribe", post(handlers::transcribe))
        .route("/api/score", post(handlers::score))
        .route("/api/speech", post(handlers::speech))
        .route("/api/audio/stop", post(handlers::audio_stop))
        .route("/api/audio/{id}", get(handlers::audio))
        .route("/api/audio/{id}/ended", post(handlers::audio_ended))
        .route("/api/recording/start", post(handlers::recording_start))
        .route("/api/recording/chunk", post(handlers::recording_chunk))
        .route("/api/recording/stop", post(handlers::recording_stop))
        .route("/api/recording/cancel", post(handlers::recording_cancel))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(app_state)
}
