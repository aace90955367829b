//! HTTP API server for session control
//!
//! This module provides a REST API for driving sessions end to end:
//! - POST /sessions/start - Allocate a session and begin collecting
//! - POST /sessions/:id/stop - Pause collection, retain data
//! - POST /sessions/:id/resume - Continue the same session
//! - POST /sessions/:id/new - Discard data, start a fresh session
//! - POST /sessions/:id/analyze - Dispatch the batch analysis request
//! - POST /sessions/:id/transcript - Feed a transcript line
//! - GET /sessions/:id/status - Per-modality counts and state
//! - GET /sessions/:id/snapshot - Full accumulated session
//! - GET /relay/face - WebSocket face-expression relay
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
