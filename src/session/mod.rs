//! Session lifecycle, accumulation, and orchestration
//!
//! This module provides:
//! - `SessionState` / `SessionController` - the explicit state machine
//!   gating every mutation of the accumulated session
//! - `Session` / `PredictionFrame` - the append-only per-modality record
//! - `SessionOrchestrator` - wires capture, streaming, accumulation, and
//!   analysis dispatch together for one logical session

mod accumulator;
mod orchestrator;
mod state;

pub use accumulator::{
    EmotionScore, FramePayload, Modality, PredictionFrame, Session, SessionStats,
};
pub use orchestrator::{OrchestratorConfig, OrchestratorError, SessionOrchestrator, StatusReport};
pub use state::{SessionController, SessionState, TransitionError};
