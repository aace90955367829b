use super::state::AppState;
use crate::analysis::AnalysisResult;
use crate::session::{
    OrchestratorError, SessionOrchestrator, SessionStats, StatusReport, TransitionError,
};
use axum::{
    extract::{Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: String,
    pub status: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub session_id: String,
    pub result: AnalysisResult,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptRequest {
    pub role: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// Map orchestration failures onto HTTP statuses: invalid transitions and
/// single-flight rejections are conflicts, device denials mean the feature
/// is unavailable, backend failures are bad gateways
fn orchestrator_error(e: OrchestratorError) -> axum::response::Response {
    let status = match &e {
        OrchestratorError::Transition(TransitionError::NoData) => StatusCode::UNPROCESSABLE_ENTITY,
        OrchestratorError::Transition(_) => StatusCode::CONFLICT,
        OrchestratorError::Acquisition(_) => StatusCode::SERVICE_UNAVAILABLE,
        OrchestratorError::Channel(_) => StatusCode::BAD_GATEWAY,
        OrchestratorError::Analysis(_) => StatusCode::BAD_GATEWAY,
    };
    error_response(status, e)
}

async fn find_session(state: &AppState, session_id: &str) -> Option<Arc<SessionOrchestrator>> {
    state.sessions.read().await.get(session_id).cloned()
}

fn not_found(session_id: &str) -> axum::response::Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Session {} not found", session_id),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions/start
/// Allocate a new session and begin collecting
pub async fn start_session(State(state): State<AppState>) -> impl IntoResponse {
    let orchestrator = Arc::new(SessionOrchestrator::new(
        state.orchestrator_config.clone(),
        Arc::clone(&state.acquisition),
        Arc::clone(&state.dispatcher),
    ));

    match orchestrator.start().await {
        Ok(session_id) => {
            state
                .sessions
                .write()
                .await
                .insert(session_id.clone(), orchestrator);
            info!(session_id = %session_id, "session started via HTTP");
            (
                StatusCode::OK,
                Json(StartSessionResponse {
                    session_id,
                    status: "collecting".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("failed to start session: {}", e);
            orchestrator_error(e)
        }
    }
}

/// POST /sessions/:session_id/stop
/// Pause collection; accumulated data is retained
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(orchestrator) = find_session(&state, &session_id).await else {
        return not_found(&session_id);
    };

    match orchestrator.stop().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(StopSessionResponse {
                session_id,
                status: "stopped".to_string(),
                stats,
            }),
        )
            .into_response(),
        Err(e) => orchestrator_error(e),
    }
}

/// POST /sessions/:session_id/resume
/// Continue collecting into the same session
pub async fn resume_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(orchestrator) = find_session(&state, &session_id).await else {
        return not_found(&session_id);
    };

    match orchestrator.resume().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StartSessionResponse {
                session_id,
                status: "collecting".to_string(),
            }),
        )
            .into_response(),
        Err(e) => orchestrator_error(e),
    }
}

/// POST /sessions/:session_id/new
/// Discard the stopped session's data and start a fresh one on the same
/// orchestrator; the new session id replaces the old routing key
pub async fn start_new_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(orchestrator) = find_session(&state, &session_id).await else {
        return not_found(&session_id);
    };

    match orchestrator.start_new().await {
        Ok(new_id) => {
            let mut sessions = state.sessions.write().await;
            sessions.remove(&session_id);
            sessions.insert(new_id.clone(), orchestrator);
            (
                StatusCode::OK,
                Json(StartSessionResponse {
                    session_id: new_id,
                    status: "collecting".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => orchestrator_error(e),
    }
}

/// POST /sessions/:session_id/analyze
/// Serialize the accumulated session into one analysis request
pub async fn analyze_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(orchestrator) = find_session(&state, &session_id).await else {
        return not_found(&session_id);
    };

    match orchestrator.analyze().await {
        Ok(result) => (
            StatusCode::OK,
            Json(AnalyzeResponse { session_id, result }),
        )
            .into_response(),
        Err(e) => {
            error!(session_id = %session_id, "analysis failed: {}", e);
            orchestrator_error(e)
        }
    }
}

/// POST /sessions/:session_id/transcript
/// Feed one conversation transcript line into the session
pub async fn append_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<TranscriptRequest>,
) -> impl IntoResponse {
    let Some(orchestrator) = find_session(&state, &session_id).await else {
        return not_found(&session_id);
    };

    let recorded = orchestrator.append_transcript(&req.role, &req.text).await;
    (
        StatusCode::OK,
        Json(serde_json::json!({ "recorded": recorded })),
    )
        .into_response()
}

/// GET /sessions/:session_id/status
pub async fn session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(orchestrator) = find_session(&state, &session_id).await else {
        return not_found(&session_id);
    };

    let report: StatusReport = orchestrator.status().await;
    (StatusCode::OK, Json(report)).into_response()
}

/// GET /sessions/:session_id/snapshot
/// Full accumulated session, read-only
pub async fn session_snapshot(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(orchestrator) = find_session(&state, &session_id).await else {
        return not_found(&session_id);
    };

    match orchestrator.snapshot().await {
        Some(session) => (StatusCode::OK, Json(session)).into_response(),
        None => not_found(&session_id),
    }
}

/// GET /relay/face
/// WebSocket upgrade for the face-expression relay
pub async fn face_relay(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let relay = Arc::clone(&state.relay);
    ws.on_upgrade(move |socket| relay.serve_socket(socket))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
