use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session control
        .route("/sessions/start", post(handlers::start_session))
        .route("/sessions/:session_id/stop", post(handlers::stop_session))
        .route(
            "/sessions/:session_id/resume",
            post(handlers::resume_session),
        )
        .route(
            "/sessions/:session_id/new",
            post(handlers::start_new_session),
        )
        .route(
            "/sessions/:session_id/analyze",
            post(handlers::analyze_session),
        )
        .route(
            "/sessions/:session_id/transcript",
            post(handlers::append_transcript),
        )
        // Session queries
        .route(
            "/sessions/:session_id/status",
            get(handlers::session_status),
        )
        .route(
            "/sessions/:session_id/snapshot",
            get(handlers::session_snapshot),
        )
        // Face-expression relay
        .route("/relay/face", get(handlers::face_relay))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
